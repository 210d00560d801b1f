use std::f64::consts::TAU;

use proptest::prelude::*;
use zearcut::{deviation, Earcut};

/// A star-shaped (hence simple) polygon around the origin, counter-clockwise.
fn star(radii: &[f64]) -> Vec<[f64; 2]> {
    let n = radii.len() as f64;
    radii
        .iter()
        .enumerate()
        .map(|(k, r)| {
            let t = k as f64 / n * TAU;
            [r * t.cos(), r * t.sin()]
        })
        .collect()
}

fn regular(n: usize, radius: f64, phase: f64) -> Vec<[f64; 2]> {
    (0..n)
        .map(|k| {
            let t = (k as f64 + phase) / n as f64 * TAU;
            [radius * t.cos(), radius * t.sin()]
        })
        .collect()
}

fn orientation(data: &[[f64; 2]], t: &[u32]) -> f64 {
    let [a, b, c] = [t[0], t[1], t[2]].map(|i| data[i as usize]);
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

fn check_triangles(data: &[[f64; 2]], triangles: &[u32]) -> Result<(), TestCaseError> {
    prop_assert_eq!(triangles.len() % 3, 0);
    for t in triangles.chunks_exact(3) {
        prop_assert!(t.iter().all(|&i| (i as usize) < data.len()));
        prop_assert!(t[0] != t[1] && t[1] != t[2] && t[0] != t[2]);
        prop_assert!(orientation(data, t) > 0.0, "inverted triangle {:?}", t);
    }
    Ok(())
}

proptest! {
    #[test]
    fn star_polygons_are_fully_covered(
        radii in prop::collection::vec(0.5f64..1.0, 3..160),
        reversed in any::<bool>(),
    ) {
        let mut data = star(&radii);
        if reversed {
            data.reverse();
        }
        let holes: &[u32] = &[];
        let mut triangles = vec![];
        Earcut::new().earcut(data.iter().copied(), holes, &mut triangles).unwrap();

        prop_assert_eq!(triangles.len(), (data.len() - 2) * 3);
        check_triangles(&data, &triangles)?;
        prop_assert!(deviation(data.iter().copied(), holes, &triangles) < 1e-9);
    }

    #[test]
    fn ring_with_a_hole_has_n_plus_m_triangles(
        n in 3usize..60,
        m in 3usize..30,
        phase in 0.0f64..1.0,
    ) {
        let mut data = regular(n, 10.0, 0.0);
        data.extend(regular(m, 3.0, phase));
        let holes = [n as u32];
        let mut triangles = vec![];
        Earcut::new().earcut(data.iter().copied(), &holes, &mut triangles).unwrap();

        // n + m vertices and one bridge worth of duplicates
        prop_assert_eq!(triangles.len(), (n + m) * 3);
        check_triangles(&data, &triangles)?;
        prop_assert!(deviation(data.iter().copied(), &holes, &triangles) < 1e-9);
    }

    #[test]
    fn repeated_points_do_not_add_triangles(
        radii in prop::collection::vec(0.5f64..1.0, 3..40),
        copies in 1usize..4,
    ) {
        let data = star(&radii);
        let repeated: Vec<_> = data
            .iter()
            .flat_map(|&p| std::iter::repeat(p).take(copies))
            .collect();
        let holes: &[u32] = &[];
        let mut triangles = vec![];
        Earcut::new().earcut(repeated.iter().copied(), holes, &mut triangles).unwrap();

        prop_assert_eq!(triangles.len(), (data.len() - 2) * 3);
        check_triangles(&repeated, &triangles)?;
    }

    #[test]
    fn hashed_and_linear_scans_agree(radii in prop::collection::vec(0.5f64..1.0, 81..200)) {
        let data = star(&radii);
        let holes: &[u32] = &[];
        let mut hashed = vec![];
        let mut linear = vec![];
        Earcut::new().earcut(data.iter().copied(), holes, &mut hashed).unwrap();
        let mut earcut = Earcut::new();
        earcut.config_mut().hash_threshold = usize::MAX;
        earcut.earcut(data.iter().copied(), holes, &mut linear).unwrap();

        prop_assert_eq!(hashed.len(), linear.len());
        prop_assert!(deviation(data.iter().copied(), holes, &hashed) < 1e-9);
    }
}
