use std::env;
use std::fs;

use serde::Deserialize;
use zearcut::{deviation, Earcut};

#[derive(Deserialize)]
struct Fixture {
    rings: Vec<Vec<[f64; 2]>>,
    triangles: usize,
    deviation: f64,
}

fn load_fixture(name: &str) {
    // load JSON
    let s = fs::read_to_string(format!("./tests/fixtures/{name}.json")).unwrap();
    let fixture: Fixture = serde_json::from_str(&s).unwrap();

    // prepare input
    let data: Vec<_> = fixture.rings.iter().flatten().copied().collect();
    let hole_indices: Vec<u32> = fixture
        .rings
        .iter()
        .map(|ring| ring.len() as u32)
        .scan(0, |sum, len| {
            *sum += len;
            Some(*sum)
        })
        .take(fixture.rings.len() - 1)
        .collect();

    // earcut
    let mut triangles = vec![];
    let mut earcut = Earcut::new();
    for _ in 0..500 {
        earcut
            .earcut(data.iter().copied(), &hole_indices, &mut triangles)
            .unwrap();
    }

    // check
    assert_eq!(triangles.len(), fixture.triangles * 3);
    let d = deviation(data.iter().copied(), &hole_indices, &triangles);
    assert!(d <= fixture.deviation);
    println!("{name}: {} triangles, deviation {d}", triangles.len() / 3);
}

fn main() {
    let name = env::args().nth(1).unwrap_or_else(|| "two-holes".to_string());
    load_fixture(&name);
}
