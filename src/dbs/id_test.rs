use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use super::*;

#[test]
fn test_id_disk() {
    let seed: u128 = random();
    println!("test_id_disk seed {}", seed);
    let mut rng = SmallRng::from_seed(seed.to_le_bytes());

    assert_eq!(disk_to_id(&id_to_disk(0)).unwrap(), 0);
    assert_eq!(disk_to_id(&id_to_disk(NOID)).unwrap(), NOID);

    for _i in 0..1000 {
        let id: Id = rng.gen();
        assert_eq!(disk_to_id(&id_to_disk(id)).unwrap(), id);
    }

    assert!(disk_to_id(&[1, 2, 3]).is_err());
}

#[test]
fn test_id_disk_order() {
    let seed: u128 = random();
    println!("test_id_disk_order seed {}", seed);
    let mut rng = SmallRng::from_seed(seed.to_le_bytes());

    // byte-wise order of the disk form must match numeric order.
    for _i in 0..1000 {
        let (a, b): (Id, Id) = (rng.gen(), rng.gen());
        assert_eq!(
            id_to_disk(a).cmp(&id_to_disk(b)),
            a.cmp(&b),
            "{} {}",
            a,
            b
        );
    }
}
