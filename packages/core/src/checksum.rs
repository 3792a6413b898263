/// Compute the XOR "checksum" of the given data
pub fn xor_sum(data: &[u8]) -> u8 {
    data.iter().fold(0xff, |acc, x| acc ^ x)
}

#[test]
fn test_xor_sum() {
    let input = hex::decode("030002").unwrap();
    let expected = 0xfe;
    assert_eq!(xor_sum(&input), expected);
}
