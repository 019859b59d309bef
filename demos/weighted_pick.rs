//! Weighted picks over a loot table: integer odds, decimal odds and a map.
//!
//! The same seed gives the same picks, so the tallies below are stable.

use std::collections::BTreeMap;

use fukubiki::{sample_by, sample_key_with_rng, Field, FieldAccessor, MapSnapshot, Named};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug)]
struct Loot {
    name: &'static str,
    odds: u32,
    rarity: f64,
}

impl FieldAccessor for Loot {
    fn field(name: &str) -> Option<Field<Self>> {
        match name {
            "odds" => Some(Field::Unsigned(|l| u64::from(l.odds))),
            "rarity" => Some(Field::Float(|l| l.rarity)),
            "name" => Some(Field::Opaque),
            _ => None,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let table = [
        Loot { name: "copper", odds: 60, rarity: 0.6 },
        Loot { name: "silver", odds: 30, rarity: 0.3 },
        Loot { name: "gold", odds: 9, rarity: 0.09 },
        Loot { name: "relic", odds: 1, rarity: 0.01 },
    ];

    let draws = 10_000;
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut tally: BTreeMap<&str, usize> = BTreeMap::new();
    for _ in 0..draws {
        let loot = sample_by(&table, &Named("odds"), &mut rng)?;
        *tally.entry(loot.name).or_default() += 1;
    }

    println!("by integer odds ({draws} draws):");
    for loot in &table {
        let n = tally.get(loot.name).copied().unwrap_or(0);
        println!("  {:<7} odds={:<3} picked={n}", loot.name, loot.odds);
    }

    let pick = sample_by(&table, &Named("rarity"), &mut rng)?;
    println!();
    println!("one pick by decimal rarity: {pick:?}");

    if let Err(e) = sample_by(&table, &Named("name"), &mut rng) {
        println!("weighting by name fails: {e}");
    }

    let stock = BTreeMap::from([("a", 10u32), ("b", 30)]);
    let key = sample_key_with_rng(&stock, &mut rng)?;
    let snap = MapSnapshot::new(&stock);
    println!();
    println!("map keys {:?} with values {:?}: picked {key}", snap.keys(), snap.values());

    Ok(())
}
