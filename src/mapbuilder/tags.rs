//! OSM tag classification rules used during way intake: small pure
//! predicate/derivation functions over a way's `(key, value)` tag pairs.

pub fn tag_value<'a>(tags: &'a [(String, String)], key: &str) -> Option<&'a str> {
    tags.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// A way is walkable iff `foot` is not {no, private}, `highway` is not a
/// motorway-class tag, and `natural` is not `water`.
pub fn is_walkable(tags: &[(String, String)]) -> bool {
    if let Some(foot) = tag_value(tags, "foot") {
        if foot == "no" || foot == "private" {
            return false;
        }
    }
    if let Some(highway) = tag_value(tags, "highway") {
        if matches!(highway, "motorway" | "motorway_link" | "trunk" | "trunk_link") {
            return false;
        }
    }
    if tag_value(tags, "natural") == Some("water") {
        return false;
    }
    true
}

/// A way is a tarn iff `natural=water`, the `water` tag (if present) is not
/// {river, stream}, and a `name` tag is present. Returns the tarn name.
pub fn tarn_name(tags: &[(String, String)]) -> Option<String> {
    if tag_value(tags, "natural") != Some("water") {
        return None;
    }
    if let Some(water) = tag_value(tags, "water") {
        if water == "river" || water == "stream" {
            return None;
        }
    }
    tag_value(tags, "name").map(|s| s.to_string())
}

/// Traffic rank derived from `highway`: motorway=6 .. off-road=0,
/// otherwise -1 ("unknown").
pub fn traffic_rank(tags: &[(String, String)]) -> i32 {
    match tag_value(tags, "highway") {
        Some("motorway") => 6,
        Some("trunk") => 5,
        Some("primary") => 4,
        Some("secondary") => 3,
        Some("tertiary") => 2,
        Some(h) if h.ends_with("_link") => 1,
        Some("unclassified") | Some("residential") | Some("service") => 1,
        Some(_) => 0,
        None => -1,
    }
}

/// Difficulty rank derived from `sac_scale`: hiking=0 ..
/// difficult_alpine_hiking=5, otherwise -1 ("unknown").
pub fn difficulty_rank(tags: &[(String, String)]) -> i32 {
    match tag_value(tags, "sac_scale") {
        Some("hiking") => 0,
        Some("mountain_hiking") => 1,
        Some("demanding_mountain_hiking") => 2,
        Some("alpine_hiking") => 3,
        Some("demanding_alpine_hiking") => 4,
        Some("difficult_alpine_hiking") => 5,
        _ => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn walkable_rejects_foot_no() {
        assert!(!is_walkable(&tags(&[("foot", "no")])));
        assert!(!is_walkable(&tags(&[("foot", "private")])));
    }

    #[test]
    fn walkable_rejects_motorway_class() {
        assert!(!is_walkable(&tags(&[("highway", "motorway")])));
        assert!(!is_walkable(&tags(&[("highway", "trunk_link")])));
    }

    #[test]
    fn walkable_rejects_water() {
        assert!(!is_walkable(&tags(&[("natural", "water")])));
    }

    #[test]
    fn walkable_accepts_plain_path() {
        assert!(is_walkable(&tags(&[("highway", "path")])));
        assert!(is_walkable(&tags(&[])));
    }

    #[test]
    fn tarn_name_requires_water_and_name() {
        assert_eq!(tarn_name(&tags(&[("natural", "water"), ("name", "Angle Tarn")])), Some("Angle Tarn".to_string()));
        assert_eq!(tarn_name(&tags(&[("natural", "water")])), None);
        assert_eq!(tarn_name(&tags(&[("name", "Angle Tarn")])), None);
    }

    #[test]
    fn tarn_name_rejects_river_and_stream() {
        assert_eq!(tarn_name(&tags(&[("natural", "water"), ("water", "river"), ("name", "River X")])), None);
        assert_eq!(tarn_name(&tags(&[("natural", "water"), ("water", "stream"), ("name", "Beck")])), None);
        assert_eq!(
            tarn_name(&tags(&[("natural", "water"), ("water", "lake"), ("name", "Lake X")])),
            Some("Lake X".to_string())
        );
    }

    #[test]
    fn traffic_rank_matches_highway_class() {
        assert_eq!(traffic_rank(&tags(&[("highway", "motorway")])), 6);
        assert_eq!(traffic_rank(&tags(&[("highway", "primary")])), 4);
        assert_eq!(traffic_rank(&tags(&[("highway", "path")])), 0);
        assert_eq!(traffic_rank(&tags(&[])), -1);
    }

    #[test]
    fn difficulty_rank_matches_sac_scale() {
        assert_eq!(difficulty_rank(&tags(&[("sac_scale", "hiking")])), 0);
        assert_eq!(difficulty_rank(&tags(&[("sac_scale", "difficult_alpine_hiking")])), 5);
        assert_eq!(difficulty_rank(&tags(&[])), -1);
    }
}
