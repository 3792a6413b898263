use aes::cipher::{
    BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit, StreamCipher,
    block_padding::ZeroPadding,
    generic_array::{GenericArray, typenum::U16},
};

type Aes128Ofb = ofb::Ofb<aes::Aes128>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

pub const MAC_SIZE: usize = 8;

pub fn encrypt_aes_ecb(plaintext: &[u8], key: &[u8]) -> Vec<u8> {
    let cipher = aes::Aes128::new(key.into());

    let mut block: GenericArray<u8, U16> = [0; 16].into();
    block.copy_from_slice(plaintext);

    cipher.encrypt_block(&mut block);

    block.to_vec()
}

/// OFB is symmetric, so this is used for both directions
pub fn apply_aes_ofb(data: &[u8], key: &[u8], iv: &[u8]) -> Vec<u8> {
    let mut cipher = <Aes128Ofb as KeyIvInit>::new(key.into(), iv.into());

    let mut buf = data.to_vec();
    cipher.apply_keystream(&mut buf);

    buf
}

pub fn encrypt_aes_ofb(plaintext: &[u8], key: &[u8], iv: &[u8]) -> Vec<u8> {
    apply_aes_ofb(plaintext, key, iv)
}

pub fn decrypt_aes_ofb(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> Vec<u8> {
    apply_aes_ofb(ciphertext, key, iv)
}

/// CBC-MAC with a zero IV as used by S0
pub fn compute_mac(plaintext: &[u8], key: &[u8]) -> Vec<u8> {
    compute_mac_iv(plaintext, key, &[0u8; 16])
}

pub fn compute_mac_iv(plaintext: &[u8], key: &[u8], iv: &[u8]) -> Vec<u8> {
    let cipher = Aes128CbcEnc::new(key.into(), iv.into());
    let buf = cipher.encrypt_padded_vec_mut::<ZeroPadding>(plaintext);
    // The MAC is the first 8 bytes of the last 16 byte block
    buf[buf.len() - 16..][..MAC_SIZE].to_vec()
}
