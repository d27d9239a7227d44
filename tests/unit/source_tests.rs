// Source reference parsing

use reelfork::SourceReference;
use rstest::rstest;

#[rstest]
#[case("https://cdn.example.com/a.mp4", true)]
#[case("HTTP://cdn.example.com/a.mp4", true)]
#[case("/var/media/a.mp4", false)]
#[case("file:///var/media/a.mp4", false)]
#[case("relative/a.mp4", false)]
fn test_parse_classifies_scheme(#[case] input: &str, #[case] remote: bool) {
    let source: SourceReference = input.parse().unwrap();
    assert_eq!(source.is_remote(), remote);
    assert_eq!(source.is_local(), !remote);
}

#[rstest]
#[case("")]
#[case("   ")]
fn test_parse_rejects_blank(#[case] input: &str) {
    assert!(input.parse::<SourceReference>().is_err());
}

#[test]
fn test_remote_url_accessor() {
    let source = SourceReference::remote("https://cdn.example.com/a.mp4");
    assert_eq!(source.url(), Some("https://cdn.example.com/a.mp4"));
    assert_eq!(SourceReference::local("/a.mp4").url(), None);
}
