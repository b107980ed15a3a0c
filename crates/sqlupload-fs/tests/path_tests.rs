use pretty_assertions::assert_eq;
use rstest::rstest;
use sqlupload_fs::NormalizedPath;

#[rstest]
#[case("index.html", Some("html"))]
#[case("NOAA/NOAA-2024.txt", Some("txt"))]
#[case("archive.tar.gz", Some("gz"))]
#[case(".htaccess", None)]
#[case("README", None)]
fn test_extension(#[case] input: &str, #[case] expected: Option<&str>) {
    assert_eq!(NormalizedPath::new(input).extension(), expected);
}

#[rstest]
#[case("index.html", "index.php")]
#[case("NOAA/NOAA-2024.txt", "NOAA/NOAA-2024.php")]
#[case("README", "README.php")]
fn test_with_extension(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(NormalizedPath::new(input).with_extension("php").as_str(), expected);
}

#[rstest]
#[case("index.html", 0)]
#[case("NOAA/NOAA-2024.txt", 1)]
#[case("./a/b/c.js", 2)]
fn test_depth(#[case] input: &str, #[case] expected: usize) {
    assert_eq!(NormalizedPath::new(input).depth(), expected);
}

#[test]
fn test_backslashes_are_normalized() {
    let path = NormalizedPath::new("NOAA\\NOAA-2024.txt");
    assert_eq!(path.as_str(), "NOAA/NOAA-2024.txt");
}

#[test]
fn test_join_absolute_segment_replaces_base() {
    let base = NormalizedPath::new("/var/www/html");
    assert_eq!(base.join("/tmp/ledger.json").as_str(), "/tmp/ledger.json");
    assert_eq!(base.join("index.html").as_str(), "/var/www/html/index.html");
}

#[test]
fn test_file_name() {
    let path = NormalizedPath::new("/var/www/html/index.html");
    assert_eq!(path.file_name(), Some("index.html"));
}

proptest::proptest! {
    #[test]
    fn prop_with_extension_only_touches_file_name(
        dir in "[a-z]{1,8}",
        stem in "[a-z][a-z0-9_-]{0,8}",
        ext in "[a-z]{1,4}",
    ) {
        let path = NormalizedPath::new(format!("{dir}/{stem}.{ext}"));
        let renamed = path.with_extension("php");
        proptest::prop_assert_eq!(
            renamed.as_str().rsplit_once('/').map(|(d, _)| d),
            path.as_str().rsplit_once('/').map(|(d, _)| d)
        );
        proptest::prop_assert_eq!(renamed.extension(), Some("php"));
        proptest::prop_assert_eq!(renamed.depth(), path.depth());
    }
}
