use std::cmp::Ordering;

use semver::Version;

pub fn compare_versions(left: &str, right: &str) -> Ordering {
    if let (Ok(left), Ok(right)) = (Version::parse(left), Version::parse(right)) {
        return left.cmp(&right);
    }
    compare_segmented(left, right)
}

fn compare_segmented(left: &str, right: &str) -> Ordering {
    let left_segments = split_segments(left);
    let right_segments = split_segments(right);
    let count = left_segments.len().max(right_segments.len());

    for index in 0..count {
        let ordering = match (left_segments.get(index), right_segments.get(index)) {
            (Some(l), Some(r)) => compare_segment(l, r),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

fn split_segments(value: &str) -> Vec<&str> {
    value
        .split(['.', '-'])
        .filter(|segment| !segment.is_empty())
        .collect()
}

fn compare_segment(left: &str, right: &str) -> Ordering {
    match (left.parse::<u64>(), right.parse::<u64>()) {
        (Ok(left), Ok(right)) => left.cmp(&right),
        _ => left.cmp(right),
    }
}
