//! MiMC sponge over the BN254 scalar field, the two-to-one hash of the pool's
//! commitment tree. Round count and constants must match the on-chain module.

use ark_bn254::Fr;
use ark_ff::{Field, MontFp, PrimeField, Zero};
use once_cell::sync::Lazy;
use sha3::{Digest, Keccak256};

pub const ROUNDS: usize = 20;

/// Seed hashed with keccak256 to derive the empty-leaf value.
pub const ZERO_LEAF_SEED: &[u8] = b"tornado";

const ROUND_CONSTANTS: [Fr; ROUNDS] = [
    MontFp!("0"),
    MontFp!("7120861356467848435263064379192047478074060781135320967663101236819528304084"),
    MontFp!("5024705281721889198577876690145313457398658950011302225525409148828000436681"),
    MontFp!("17980351014018068290387269214713820287804403312720763401943303895585469787384"),
    MontFp!("19886576439381707240399940949310933992335779767309383709787331470398675714258"),
    MontFp!("1213715278223786725806155661738676903520350859678319590331207960381534602599"),
    MontFp!("18162138253399958831050545255414688239130588254891200470934232514682584734511"),
    MontFp!("7667462281466170157858259197976388676420847047604921256361474169980037581876"),
    MontFp!("7207551498477838452286210989212982851118089401128156132319807392460388436957"),
    MontFp!("9864183311657946807255900203841777810810224615118629957816193727554621093838"),
    MontFp!("4798196928559910300796064665904583125427459076060519468052008159779219347957"),
    MontFp!("17387238494588145257484818061490088963673275521250153686214197573695921400950"),
    MontFp!("10005334761930299057035055370088813230849810566234116771751925093634136574742"),
    MontFp!("11897542014760736209670863723231849628230383119798486487899539017466261308762"),
    MontFp!("16771780563523793011283273687253985566177232886900511371656074413362142152543"),
    MontFp!("749264854018824809464168489785113337925400687349357088413132714480582918506"),
    MontFp!("3683645737503705042628598550438395339383572464204988015434959428676652575331"),
    MontFp!("7556750851783822914673316211129907782679509728346361368978891584375551186255"),
    MontFp!("20391289379084797414557439284689954098721219201171527383291525676334308303023"),
    MontFp!("0"),
];

static ZERO_LEAF: Lazy<Fr> =
    Lazy::new(|| Fr::from_be_bytes_mod_order(&Keccak256::digest(ZERO_LEAF_SEED)));

/// keccak256("tornado") mod p
pub fn zero_leaf() -> Fr {
    *ZERO_LEAF
}

/// One Feistel permutation with key `k`; returns `(xL, xR)`.
pub fn feistel(mut xl: Fr, mut xr: Fr, k: Fr) -> (Fr, Fr) {
    for (i, c) in ROUND_CONSTANTS.iter().enumerate() {
        let t = if i == 0 || i == ROUNDS - 1 {
            xl + k
        } else {
            xl + k + c
        };
        let t5 = t.square().square() * t;
        if i < ROUNDS - 1 {
            let prev_xr = xr;
            xr = xl;
            xl = prev_xr + t5;
        } else {
            xr += t5;
        }
    }
    (xl, xr)
}

/// Sponge absorbing `left` then `right`, squeezing one element.
pub fn hash_left_right(left: &Fr, right: &Fr) -> Fr {
    let (r, c) = feistel(*left, Fr::zero(), Fr::zero());
    let (out, _) = feistel(r + right, c, Fr::zero());
    out
}

/// Sponge over an arbitrary number of inputs.
pub fn multi_hash(inputs: &[Fr]) -> Fr {
    let mut r = Fr::zero();
    let mut c = Fr::zero();
    for input in inputs {
        r += input;
        let (xl, xr) = feistel(r, c, Fr::zero());
        r = xl;
        c = xr;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_round_constants() {
        assert!(ROUND_CONSTANTS[0].is_zero());
        assert!(ROUND_CONSTANTS[ROUNDS - 1].is_zero());
        assert_eq!(
            ROUND_CONSTANTS[1],
            Fr::from_str("7120861356467848435263064379192047478074060781135320967663101236819528304084")
                .unwrap()
        );
        assert_eq!(
            ROUND_CONSTANTS[18],
            Fr::from_str("20391289379084797414557439284689954098721219201171527383291525676334308303023")
                .unwrap()
        );
    }

    #[test]
    fn test_zero_leaf_matches_known_value() {
        let expected = Fr::from_str(
            "21663839004416932945382355908790599225266501822907911457504978515578255421292",
        )
        .unwrap();
        assert_eq!(zero_leaf(), expected);
    }

    #[test]
    fn test_hash_is_order_sensitive() {
        let a = Fr::from(1u64);
        let b = Fr::from(2u64);
        assert_eq!(hash_left_right(&a, &b), hash_left_right(&a, &b));
        assert_ne!(hash_left_right(&a, &b), hash_left_right(&b, &a));
    }

    #[test]
    fn test_two_input_sponge_agrees_with_pair_hash() {
        let a = Fr::from(7u64);
        let b = Fr::from(11u64);
        assert_eq!(multi_hash(&[a, b]), hash_left_right(&a, &b));
    }
}
