// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Curve material for precompile inputs: secp256k1 signatures for ECRECOVER, BLS12-381 points
//! in the EIP-2537 encoding, and fixed vectors the precompiles accept.

use crate::operand::OperandSynth;
use bls12_381::{G1Affine, G1Projective, G2Affine, G2Projective, Scalar};
use k256::ecdsa::SigningKey;

/// (G1, G2) pairs on alt_bn128 whose pairing product is one, for each supported pair count.
const ECPAIRING_ONE_PAIR: &str = concat!(
    "089142debb13c461f61523586a60732d8b69c5b38a3380a74da7b2961d867dbf",
    "2d5fc7bbc013c16d7945f190b232eacc25da675c0eb093fe6b9f1b4b4e107b36",
    "29f2c1dbcc614745f242077001ec9edd475acdab9ab435770d456bd22bbd2abf",
    "268683f9b1be0bde4508e2e25e51f6b44da3546e87524337d506fd03c4ff7ce0",
    "1851abe58ef4e08916bec8034ca62c04cd08340ab6cc525e6170634092622165",
    "1b71422869c92e49465200ca19033a8aa425f955be3d8329c4475503e45c00e1",
);

const ECPAIRING_TWO_PAIRS: &str = concat!(
    "2cf44499d5d27bb186308b7af7af02ac5bc9eeb6a3d147c186b21fb1b76e18da",
    "2c0f001f52110ccfe69108924926e45f0b0c868df0e7bde1fe16d3242dc715f6",
    "1fb19bb476f6b9e44e2a32234da8212f61cd63919354bc06aef31e3cfaff3ebc",
    "22606845ff186793914e03e21df544c34ffe2f2f3504de8a79d9159eca2d98d9",
    "2bd368e28381e8eccb5fa81fc26cf3f048eea9abfdd85d7ed3ab3698d63e4f90",
    "2fe02e47887507adf0ff1743cbac6ba291e66f59be6bd763950bb16041a0a85e",
    "0000000000000000000000000000000000000000000000000000000000000001",
    "30644e72e131a029b85045b68181585d97816a916871ca8d3c208c16d87cfd45",
    "1971ff0471b09fa93caaf13cbf443c1aede09cc4328f5a62aad45f40ec133eb4",
    "091058a3141822985733cbdddfed0fd8d6c104e9e9eff40bf5abfef9ab163bc7",
    "2a23af9a5ce2ba2796c1f4e453a370eb0af8c212d9dc9acd8fc02c2e907baea2",
    "23a8eb0b0996252cb548a4487da97b02422ebc0e834613f954de6c7e0afdc1fc",
);

const ECPAIRING_FOUR_PAIRS: &str = concat!(
    "03d310db98253bb4a3aaff90eeb790d236cbc5698d5a9a6014965acff56e759a",
    "1edc5e9ae29193d6e5deed5c3ac4171cae2da155880cf6058848318de6859ea2",
    "1ee564b4d91e10d3c3a34787dc163a79bf9d571eeb67ff072609cbe19ff25fc7",
    "270e094c2467dcf6ecf8c97a09ef643cfff359cbec1426c5eb01864b5cf3c273",
    "09f432f65daced7c895c3748fa0b0dfc430584e419442a25b98e744007898012",
    "10fa7bc208e286ebea1f5c342a96782b563a0bc4cdb4c42ba151b9cb76eea93d",
    "0abcdaf6ffdf0cbf20235077c7bb3908b74b9a8252083f4b01dcbe84cab90fc7",
    "1a9681988a15b7eea9ae8cb0c2210b870eec2366e0531c414abb65c668c6eb3e",
    "21d0be81c5698882ee63cb729ed3f5b725d7a670b76941ddffff9ddca50cf9af",
    "21e61a0ac51a17c0128baa2cda8f212b13943959cf26a7578342c93dd2de7deb",
    "194e408b546197d9ee99d643e5385dcb8d5904854d8a836763ab8ce20f9b5027",
    "222aced81c808247572971b490eef1515a49f651f7df254de2b35310bb5b78c2",
    "18b2345c40036ea331bfcfb8536739a5e5530027709adae6632a3613cd0838cd",
    "204121beebd54ec6bb063ba5a6d84eeceda2a733260066c90d332425e992ef6c",
    "2b0f794d64952d560a422a7ff549a58bfaa0cf791ab6dfad1c4941e190780403",
    "24bad1c848f2d8efcd716f7d814c46e2632e74a5b8d455a64c55917b220aab98",
    "2ed4bbed5f80fac726f4a95789fee7905eef0a241596acbea4268ec3f2b87f31",
    "29563b69a30c11a856f68c72f129988e8636c86f57467cba299cdb4917469b49",
    "137a989e5d714b4b882d4a455600940ab63b14f23e7934ddd62cf5181099c63b",
    "2f57525eb3d19451024a4e71ee09c72c5b7e0dff925001acaee126bcd29db5f6",
    "00d8ff46230e348d08dcbcdb1f85a5a43aa7b4f51841f1d4f98c18bbb5765198",
    "2cabdf6326194120727367bdae0b081aa7da12c8f8c6af0ce27d2f8d0f059fe1",
    "240c9c5a6993d344744d77bbb855960b6704e91846cf362444bff1ccaf45a7c2",
    "17873a5d7834d0c1d7d9bab5f9934d7ac218834aa916d459d8ceafc280d59efb",
);

const ECPAIRING_EIGHT_PAIRS: &str = concat!(
    "03d333c171b569f9721355f4b5f9569c18006d55ea805d0ab72f392e6e6be88e",
    "230688a302d20e6934bc1151bf8a0af65d4294568f5af0b041197aaec74aabea",
    "1aae25b6edb4994684b2877875575b74c14a19eb068d429accd0bbbcd4de1d11",
    "0b2f112b63197fcaa10a2afb08cd221bd509c829efecdd4a3bade00bf947cc39",
    "11796bc946a8148ce73aa901e2e1f4dcb259b11ee880e088ddff65f5f6f05d44",
    "1ae8c9a28a7ee1d483dc47235e16e19303455ee1b7c6c29fdff01d3eab2c4e77",
    "284e25e7b8203b7b40dbf1bfcdb4fbdedea474fd44ed67dab27a031959453e9b",
    "0010adb1d55c492437f0bab7e1b63a56467681f06a29aca6ab95d29d5fd23c35",
    "29e107847478c3dd0aeb69d6c4345dd0239ba105a1bddc699512e027bbb34b81",
    "111903892d003d32111610c7ccd4c529f75cc8bf33a894f40756510ec8b9bcfd",
    "0402b66e82c6b8fd6de9652d5c81821f69445b0dca7cd052e1811760803f778a",
    "1ae8318c37a3652bdcab122282e95dd3f7393b3214e8ce290c01c9345ce81d1c",
    "09304eb9899baa26aa963503f8a55ed2a5d0cc2d5d0fbdfae81c3a823790d237",
    "1874cf1b2e447a896844c5338098f2ad9dea545e40d5f5a4369125d95fcd5acf",
    "0c0ffafa0ba1c1053fdc155d63329f5d8540fe5c6a876793e04913a1e6a7c888",
    "15fe284d364a500612c376e7bd39a466e1b9c4c0a85b105d15a973db33a0f1d4",
    "2ee64373074312ec2147daed5fbc660ff99664dcb993750af8f192ee51b849a5",
    "1d9a24c4dbe4f69715d00e8ede2f32c2a54c5e8f8a57487cf80dad49915cdc18",
    "239b7847b2fe9c17f926ad11e5161802872b6607265d5bf10c737d9eb157506c",
    "05725034e5c2a941efb693478b4401e684afba8af20cfc14c53f66652c737ab7",
    "1657a4156fc5dc9ddf2b07d05c72395c7bb98f97743c6a81dcc11d25dcf31389",
    "0effb8dceb430ae9009afe11d1f00e0ec2ca627ce9c4919287a319590dfba56d",
    "1d76f3288b570588497d0e5cc88341ba9b40b8fee65f042836161d718ebba122",
    "03bab8927db4e4b4dcf9ca7f4250c61d0a055985996d04e0c76d49bc83bad37e",
    "0a1a1f642a16d95eaddfb9b7a403bdd032f07c9222813df4dda4aa3054716d76",
    "22a999ac90eaa7bbc4ec78bb5d47736aaf04f706ddcc4724776a5dc0bc39cd1a",
    "0c9c5fb89113f93dc81db66c1ca13534f16518fb0347056c08bac62a1bcd1b20",
    "1516a4f52fca78d9d140d40687b093176eb90fb236c03cad3ebf57027afc1174",
    "2095f3a98a957815f7b13e263a5f11bccea9f6e716e219915e9075d9c0c2a8e0",
    "260e553a1182aa35b5d8d710c9705010e1350c02b6a217ec61245bee22c85098",
    "10027b242574ec29b652f249774d7320612dde5ca36f20f42bb169352a568e4c",
    "14a972b4ef4a1ca49f0e4b095f77ec5929486d1a051ed3b766a40d442e8e7d3b",
    "04ebc527aedcdd807d94774c23dbf3bf2841a2a0e3272e10431a056b1fb1224d",
    "16565b2f5350a0c8bcdcc6a3a2d189cc488c6c88cf9a0bd213248f73095f4ac0",
    "116d2a932043b527cb2a7c42e329a00310c9418da803179a099418ddb9ed859b",
    "06035b9b8fa5ebdbcc460641e8af2bd20e68e62d50563672a52294cc0e94cb33",
    "1287c3cc9c9b8f389de88ed033ca26234d38089a712dfac171b8c8d743c5a256",
    "0b1f5c5d64fb31d6830a6c982fc8daafcc6b2ac02ac20685e11cf211edadf2bc",
    "01f9b7d3b716110dbfcda9974d00a0e90721e9aae490f3e0ba84b55cefa94919",
    "197ef9a4b21ccef5186f0d9801a25cbb77227b2d8488fa8da35e8c70495fb686",
    "1997575cfbbc644daf21868564be6a9fbfd216b252271f08fce405355d84d490",
    "28f6c5397686e765c5157034c2ed2f92e2d11c7411613f5c60b5ee50540df6fc",
    "025a3e1aee7b30e3113afca04fa7e3949a54f65a25aa8241d5056f289c3378a7",
    "2d4730731a6659294dfe163718d63cc6239d09033ba48004c52a9d55d66317b6",
    "2493908d3215efe3d2cb77ff6447a971599b2df711a59395515c4cac93a0f221",
    "1fada2e1799efd65247699ffbc3b35cce7d210a61e868d3bd8abb37e20bd5afe",
    "2a628ffe54a17a274af70c3584b4f9a2e567c6ae5d5a00d14ac7ffc12d04e06a",
    "03d1fee23fa99c63fb8a760fe4794af4221f7bb7ceb194c7df2c63859c8b0329",
);

/// Pair counts with a verifying ECPAIRING vector.
pub(crate) const ECPAIRING_PAIR_COUNTS: [usize; 4] = [1, 2, 4, 8];

/// Versioned hash, z, y, commitment and proof of a KZG opening that verifies.
const POINTEVAL_VECTOR: &str = concat!(
    "013c03613f6fc558fb7e61e75602241ed9a2f04e36d8670aadd286e71b5ca9cc",
    "4200000000000000000000000000000000000000000000000000000000000000",
    "31e5a2356cbc2ef6a733eae8d54bf48719ae3d990017ca787c419c7d369f8e3c",
    "83fac17c3f237fc51f90e2c660eb202a438bc2025baded5cd193c1a018c5885b",
    "c9281ba704d5566082e851235c7be763b2a99adff965e0a121ee972ebc472d02",
    "944a74f5c6243e14052e105124b70bf65faf85ad3a494325e269fad097842cba",
);

const SIGNING_ATTEMPTS: usize = 16;

/// Bytes of one field element.
const FP_LEN: usize = 48;
/// Bytes of one field element padded for the precompile ABI.
const PADDED_FP_LEN: usize = 64;

pub(crate) fn ecpairing_vector(pairs: usize) -> Result<Vec<u8>, String> {
    let vector = match pairs {
        1 => ECPAIRING_ONE_PAIR,
        2 => ECPAIRING_TWO_PAIRS,
        4 => ECPAIRING_FOUR_PAIRS,
        8 => ECPAIRING_EIGHT_PAIRS,
        other => return Err(format!("no pairing vector with {other} pairs")),
    };
    hex::decode(vector).map_err(|e| e.to_string())
}

pub(crate) fn pointeval_vector() -> Result<Vec<u8>, String> {
    hex::decode(POINTEVAL_VECTOR).map_err(|e| e.to_string())
}

/// `hash ‖ v ‖ r ‖ s` for a signature over a random hash by a random key.
pub(crate) fn ecrecover_input(synth: &mut OperandSynth) -> Result<Vec<u8>, String> {
    let hash = synth.array::<32>();
    let key = (0..SIGNING_ATTEMPTS)
        .find_map(|_| SigningKey::from_slice(&synth.array::<32>()).ok())
        .ok_or_else(|| format!("no valid secp256k1 key in {SIGNING_ATTEMPTS} attempts"))?;
    let (signature, recovery) = key
        .sign_prehash_recoverable(&hash)
        .map_err(|e| e.to_string())?;

    let mut input = Vec::with_capacity(128);
    input.extend_from_slice(&hash);
    let mut v = [0u8; 32];
    v[31] = 27 + u8::from(recovery.is_y_odd());
    input.extend_from_slice(&v);
    input.extend_from_slice(&signature.to_bytes());
    Ok(input)
}

fn random_scalar(synth: &mut OperandSynth) -> Scalar {
    Scalar::from_bytes_wide(&synth.array::<64>())
}

/// Left-pad each 48-byte field element to 64 bytes, clearing the flag bits of the
/// uncompressed serialization.
fn pad_field_elements(elements: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(elements.len() * PADDED_FP_LEN);
    for element in elements {
        debug_assert_eq!(element.len(), FP_LEN);
        out.extend_from_slice(&[0u8; PADDED_FP_LEN - FP_LEN]);
        let start = out.len();
        out.extend_from_slice(element);
        out[start] &= 0x1f;
    }
    out
}

/// A random G1 point, 128 bytes.
pub(crate) fn g1_point(synth: &mut OperandSynth) -> Vec<u8> {
    let point = G1Affine::from(G1Projective::generator() * random_scalar(synth));
    let raw = point.to_uncompressed();
    let (x, y) = raw.split_at(FP_LEN);
    pad_field_elements(&[x, y])
}

/// A random G2 point, 256 bytes, with each Fp2 coordinate as c0 then c1.
pub(crate) fn g2_point(synth: &mut OperandSynth) -> Vec<u8> {
    let point = G2Affine::from(G2Projective::generator() * random_scalar(synth));
    let raw = point.to_uncompressed();
    // Serialized as x.c1, x.c0, y.c1, y.c0.
    let chunk = |idx: usize| &raw[idx * FP_LEN..(idx + 1) * FP_LEN];
    pad_field_elements(&[chunk(1), chunk(0), chunk(3), chunk(2)])
}

/// A random field element below the modulus, 64 bytes.
pub(crate) fn field_element(synth: &mut OperandSynth) -> Vec<u8> {
    let mut element = vec![0u8; PADDED_FP_LEN - FP_LEN + 1];
    element.extend_from_slice(&synth.bytes(FP_LEN - 1));
    element
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
    use pretty_assertions::assert_eq;

    #[test]
    fn fixed_vectors_decode() {
        for pairs in ECPAIRING_PAIR_COUNTS {
            assert_eq!(ecpairing_vector(pairs).unwrap().len(), pairs * 192);
        }
        assert!(ecpairing_vector(3).is_err());
        assert_eq!(pointeval_vector().unwrap().len(), 192);
    }

    #[test]
    fn signatures_recover_to_the_signer() {
        let mut synth = OperandSynth::seeded(9);
        let input = ecrecover_input(&mut synth).unwrap();
        assert_eq!(input.len(), 128);
        let v = input[63];
        assert!(v == 27 || v == 28);
        let signature = Signature::from_slice(&input[64..]).unwrap();
        let recovery = RecoveryId::from_byte(v - 27).unwrap();
        assert!(VerifyingKey::recover_from_prehash(&input[..32], &signature, recovery).is_ok());
    }

    #[test]
    fn points_are_padded() {
        let mut synth = OperandSynth::seeded(2);
        let g1 = g1_point(&mut synth);
        assert_eq!(g1.len(), 128);
        assert!(g1[..16].iter().all(|b| *b == 0));
        assert!(g1[64..80].iter().all(|b| *b == 0));
        let g2 = g2_point(&mut synth);
        assert_eq!(g2.len(), 256);
        for chunk in g2.chunks(64) {
            assert!(chunk[..16].iter().all(|b| *b == 0));
        }
    }

    #[test]
    fn g1_points_decode_back() {
        let mut synth = OperandSynth::seeded(4);
        let encoded = g1_point(&mut synth);
        let mut raw = [0u8; 96];
        raw[..48].copy_from_slice(&encoded[16..64]);
        raw[48..].copy_from_slice(&encoded[80..128]);
        assert!(bool::from(G1Affine::from_uncompressed(&raw).is_some()));
    }

    #[test]
    fn field_elements_are_below_the_modulus() {
        let mut synth = OperandSynth::seeded(6);
        let fp = field_element(&mut synth);
        assert_eq!(fp.len(), 64);
        assert!(fp[..17].iter().all(|b| *b == 0));
    }
}
