//! Structural analysis of a downloaded file tree.
//!
//! Classifies a work as single-part or multi-part ("discs") and derives an
//! ordering key per audio file so playback order can be reconstructed across
//! inconsistently named directory structures. The parsing is heuristic by
//! design: non-matching names yield `None` rather than errors.

use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::models::FileEntry;

lazy_static! {
    /// Disc/part marker anywhere in the relative path, Arabic or Roman.
    static ref DISC_MARKER: Regex =
        Regex::new(r"(?i)\b(?:disc|disk|cd|part)\s*([0-9]+|[IVXLC]+)\b").unwrap();
    /// Track/chapter marker in the filename.
    static ref TRACK_MARKER: Regex = Regex::new(r"(?i)\b(?:track|chapter)\s*([0-9]+)\b").unwrap();
    /// Leading numeric prefix in the filename, e.g. "03 - Chapter Three.mp3".
    static ref LEADING_NUMBER: Regex = Regex::new(r"^\s*([0-9]+)").unwrap();
}

/// Ordering key derived from a file's relative path.
///
/// Sorts by `(disc, track, original path)`; entries with no extractable
/// number sort after all numbered entries but keep their relative order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscTrackKey {
    pub disc_number: Option<u32>,
    pub track_number: Option<u32>,
    pub original_path: PathBuf,
}

impl DiscTrackKey {
    /// Derive the key from a file entry's relative path.
    ///
    /// The disc marker is searched across the whole relative path (directory
    /// components included); track markers only in the filename.
    pub fn from_entry(entry: &FileEntry) -> Self {
        let full_path = entry.relative_path.to_string_lossy();
        let file_name = entry
            .relative_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let disc_number = DISC_MARKER
            .captures(&full_path)
            .and_then(|c| parse_numeral(&c[1]));

        let track_number = TRACK_MARKER
            .captures(&file_name)
            .and_then(|c| c[1].parse::<u32>().ok())
            .or_else(|| {
                LEADING_NUMBER
                    .captures(&file_name)
                    .and_then(|c| c[1].parse::<u32>().ok())
            });

        Self {
            disc_number,
            track_number,
            original_path: entry.relative_path.clone(),
        }
    }
}

impl Ord for DiscTrackKey {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_optional(self.disc_number, other.disc_number)
            .then_with(|| cmp_optional(self.track_number, other.track_number))
            .then_with(|| self.original_path.cmp(&other.original_path))
    }
}

impl PartialOrd for DiscTrackKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// `Some` before `None`, so unnumbered entries sort last.
fn cmp_optional(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Parse an Arabic or simple Roman numeral (I through C is sufficient for
/// disc numbering).
pub fn parse_numeral(s: &str) -> Option<u32> {
    if s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse().ok();
    }
    parse_roman(s)
}

fn roman_value(c: char) -> Option<u32> {
    match c.to_ascii_uppercase() {
        'I' => Some(1),
        'V' => Some(5),
        'X' => Some(10),
        'L' => Some(50),
        'C' => Some(100),
        _ => None,
    }
}

/// Lookup-based Roman numeral parser with the standard subtractive rule.
fn parse_roman(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let values: Vec<u32> = s.chars().map(roman_value).collect::<Option<_>>()?;
    let mut total = 0u32;
    for (i, &value) in values.iter().enumerate() {
        if values.get(i + 1).is_some_and(|&next| next > value) {
            total = total.checked_sub(value).unwrap_or(0);
        } else {
            total += value;
        }
    }
    (total >= 1 && total <= 100).then_some(total)
}

/// Result of analyzing a file tree's disc/track structure.
#[derive(Debug, Clone)]
pub struct DiscAnalysis {
    /// True iff at least two distinct disc numbers were found.
    pub is_multi_part: bool,
    /// Number of distinct disc numbers (0 if none were found).
    pub disc_count: usize,
    /// Audio entries paired with their ordering keys, input order preserved.
    pub entries: Vec<(FileEntry, DiscTrackKey)>,
}

/// Analyze the audio entries of a file tree.
///
/// Non-audio entries are excluded here; the flatten planner deals with them
/// separately. Entries without an extractable disc number are still included
/// so a plain single-disc layout produces a usable flat ordering.
pub fn analyze(tree: &[FileEntry]) -> DiscAnalysis {
    let entries: Vec<(FileEntry, DiscTrackKey)> = tree
        .iter()
        .filter(|e| e.is_audio())
        .map(|e| (e.clone(), DiscTrackKey::from_entry(e)))
        .collect();

    let discs: BTreeSet<u32> = entries
        .iter()
        .filter_map(|(_, key)| key.disc_number)
        .collect();

    DiscAnalysis {
        is_multi_part: discs.len() >= 2,
        disc_count: discs.len(),
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str) -> FileEntry {
        FileEntry::new(path, 1024)
    }

    fn key(path: &str) -> DiscTrackKey {
        DiscTrackKey::from_entry(&entry(path))
    }

    #[test]
    fn test_disc_marker_variants() {
        assert_eq!(key("Disc 1/a.mp3").disc_number, Some(1));
        assert_eq!(key("disk 02/a.mp3").disc_number, Some(2));
        assert_eq!(key("CD3/a.mp3").disc_number, Some(3));
        assert_eq!(key("Part 12/a.mp3").disc_number, Some(12));
        assert_eq!(key("Bonus/a.mp3").disc_number, None);
    }

    #[test]
    fn test_roman_disc_numbers() {
        assert_eq!(key("Disc IV/a.mp3").disc_number, Some(4));
        assert_eq!(key("Part IX/a.mp3").disc_number, Some(9));
        assert_eq!(key("CD XL/a.mp3").disc_number, Some(40));
    }

    #[test]
    fn test_parse_roman() {
        assert_eq!(parse_roman("I"), Some(1));
        assert_eq!(parse_roman("iv"), Some(4));
        assert_eq!(parse_roman("XIV"), Some(14));
        assert_eq!(parse_roman("XC"), Some(90));
        assert_eq!(parse_roman("C"), Some(100));
        assert_eq!(parse_roman(""), None);
        assert_eq!(parse_roman("ABC"), None);
    }

    #[test]
    fn test_track_marker_and_leading_number() {
        assert_eq!(key("Disc 1/Track 07.mp3").track_number, Some(7));
        assert_eq!(key("Chapter 3.m4b").track_number, Some(3));
        assert_eq!(key("04 - The Sleeper.mp3").track_number, Some(4));
        assert_eq!(key("intro.mp3").track_number, None);
    }

    #[test]
    fn test_disc_from_directory_track_from_filename() {
        let k = key("CD 2/11 Sandworms.mp3");
        assert_eq!(k.disc_number, Some(2));
        assert_eq!(k.track_number, Some(11));
    }

    #[test]
    fn test_ordering_numbered_before_unnumbered() {
        let numbered = key("Disc 1/Track 01.mp3");
        let unnumbered = key("appendix.mp3");
        assert!(numbered < unnumbered);
    }

    #[test]
    fn test_ordering_total_and_idempotent() {
        let mut keys = vec![
            key("Disc 2/Track 01.mp3"),
            key("zz_outro.mp3"),
            key("Disc 1/Track 02.mp3"),
            key("Disc 1/Track 01.mp3"),
            key("aa_intro.mp3"),
        ];
        keys.sort();

        let paths: Vec<_> = keys
            .iter()
            .map(|k| k.original_path.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            paths,
            vec![
                "Disc 1/Track 01.mp3",
                "Disc 1/Track 02.mp3",
                "Disc 2/Track 01.mp3",
                "aa_intro.mp3",
                "zz_outro.mp3",
            ]
        );

        // Sorting a sorted list is a no-op.
        let once = keys.clone();
        keys.sort();
        assert_eq!(keys, once);
    }

    #[test]
    fn test_analyze_multi_part() {
        let tree = vec![
            entry("Disc 1/Track 01.mp3"),
            entry("Disc 1/Track 02.mp3"),
            entry("Disc 2/Track 01.mp3"),
            entry("cover.jpg"),
        ];
        let analysis = analyze(&tree);

        assert!(analysis.is_multi_part);
        assert_eq!(analysis.disc_count, 2);
        // cover.jpg filtered out
        assert_eq!(analysis.entries.len(), 3);
    }

    #[test]
    fn test_analyze_single_disc() {
        let tree = vec![entry("CD 1/Track 01.mp3"), entry("CD 1/Track 02.mp3")];
        let analysis = analyze(&tree);
        assert!(!analysis.is_multi_part);
        assert_eq!(analysis.disc_count, 1);
    }

    #[test]
    fn test_analyze_no_numbering() {
        let tree = vec![entry("one.mp3"), entry("two.mp3")];
        let analysis = analyze(&tree);
        assert!(!analysis.is_multi_part);
        assert_eq!(analysis.disc_count, 0);
        assert_eq!(analysis.entries.len(), 2);
    }
}
