// tests/ingest_normalize.rs
use telegram_harvester::normalize_amharic_text;

#[test]
fn empty_is_ok() {
    assert_eq!(normalize_amharic_text(""), "");
}

#[test]
fn folds_whitespace_and_trims() {
    assert_eq!(normalize_amharic_text("  hello   world  "), "hello world");
    assert_eq!(normalize_amharic_text("A\u{00A0}\n\tB   C"), "A B C");
}

#[test]
fn strips_traditional_delimiters() {
    let n = normalize_amharic_text("ሰላም፡ አለም።ዋጋ:100");
    assert_eq!(n, "ሰላም አለም ዋጋ 100");
}

#[test]
fn output_never_contains_breaks_or_delimiters() {
    let inputs = [
        "line1\nline2\r\nline3\r",
        "፡፡፡።።:::",
        "  ስልክ ፡ 0911 ። \n\n ይደውሉ : ",
        "plain",
    ];
    for s in inputs {
        let n = normalize_amharic_text(s);
        assert!(
            !n.contains(['\n', '\r', '፡', '።', ':']),
            "unexpected char left in {n:?}"
        );
        assert!(!n.contains("  "), "double space left in {n:?}");
        assert_eq!(n, n.trim());
    }
}

#[test]
fn applying_twice_changes_nothing() {
    let s = "\tአዲስ፡፡ ዕቃ\r\n\r\nገብቷል።  ";
    let once = normalize_amharic_text(s);
    assert_eq!(normalize_amharic_text(&once), once);
}
