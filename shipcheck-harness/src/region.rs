//! Region selection and run identifiers

use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;

const UNIQUE_ID_LEN: usize = 6;

/// Container registry multi-region serving `region`
///
/// `europe-west1` maps to `eu`, `asia-northeast1` to `asia`, everything
/// else to `us`.
pub fn lookup_multi_region(region: &str) -> &'static str {
    let prefix = region.split('-').next().unwrap_or_default();
    match prefix {
        "europe" => "eu",
        "asia" => "asia",
        _ => "us",
    }
}

/// Picks a region from `allowed` that is not in `forbidden`
pub fn pick_random_region<R: Rng + ?Sized>(
    allowed: &[String],
    forbidden: &[String],
    rng: &mut R,
) -> Option<String> {
    let candidates: Vec<&String> = allowed
        .iter()
        .filter(|region| !forbidden.contains(region))
        .collect();
    candidates.choose(rng).map(|region| region.to_string())
}

/// Short base-62 identifier used to namespace the resources of one run
pub fn unique_id() -> String {
    unique_id_with(&mut rand::thread_rng())
}

pub fn unique_id_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..UNIQUE_ID_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn regions(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_lookup_multi_region() {
        assert_eq!(lookup_multi_region("europe-west1"), "eu");
        assert_eq!(lookup_multi_region("asia-northeast1"), "asia");
        assert_eq!(lookup_multi_region("us-central1"), "us");
        assert_eq!(lookup_multi_region("australia-southeast1"), "us");
        assert_eq!(lookup_multi_region(""), "us");
    }

    #[test]
    fn test_pick_random_region_respects_forbidden() {
        let mut rng = StdRng::seed_from_u64(7);
        let allowed = regions(&["us-east1", "europe-west1"]);
        let forbidden = regions(&["us-east1"]);

        for _ in 0..20 {
            assert_eq!(
                pick_random_region(&allowed, &forbidden, &mut rng).as_deref(),
                Some("europe-west1")
            );
        }
    }

    #[test]
    fn test_pick_random_region_none_left() {
        let mut rng = StdRng::seed_from_u64(7);
        let allowed = regions(&["us-east1"]);
        assert!(pick_random_region(&allowed, &allowed, &mut rng).is_none());
        assert!(pick_random_region(&[], &[], &mut rng).is_none());
    }

    #[test]
    fn test_unique_id_shape() {
        let id = unique_id();
        assert_eq!(id.len(), UNIQUE_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));

        let mut rng = StdRng::seed_from_u64(42);
        let a = unique_id_with(&mut rng);
        let b = unique_id_with(&mut rng);
        assert_ne!(a, b);
    }
}
