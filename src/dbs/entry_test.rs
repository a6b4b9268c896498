use arbitrary::{Arbitrary, Unstructured};
use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use super::*;

#[test]
fn test_entry_codec() {
    let seed: u128 = random();
    println!("test_entry_codec seed {}", seed);
    let mut rng = SmallRng::from_seed(seed.to_le_bytes());

    for _i in 0..100 {
        let attrs: Vec<Attr> = {
            let bytes: Vec<u8> = (0..1024).map(|_| rng.gen()).collect();
            let mut uns = Unstructured::new(&bytes);
            Vec::<Attr>::arbitrary(&mut uns).unwrap()
        };
        let mut entry = Entry::new("cn=A,ou=People,o=X", attrs);
        entry.id = rng.gen();

        let data = entry.to_bytes().unwrap();
        assert_eq!(Entry::from_bytes(&data).unwrap(), entry);
    }
}

#[test]
fn test_entry_new() {
    let entry = Entry::new("CN=A, O=X", vec![Attr::new("cn", vec![b"A".to_vec()])]);
    assert_eq!(entry.id, NOID);
    assert_eq!(entry.ndn, "cn=a,o=x");
    assert!(entry.as_attr("CN").is_some());
    assert!(entry.as_attr("sn").is_none());
}
