// tests/providers_web_preview.rs
use std::fs;
use telegram_harvester::ingest::providers::web_preview::parse_page;
use telegram_harvester::ingest::types::MediaAttachment;

#[test]
fn fixture_page_parses_into_messages() {
    let html = fs::read_to_string("tests/fixtures/channel_page.html")
        .expect("missing tests/fixtures/channel_page.html");
    let msgs = parse_page(&html).expect("page parse ok");

    let ids: Vec<i64> = msgs.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![101, 102, 103, 104]);

    let first = &msgs[0];
    assert_eq!(
        first.text.as_deref(),
        Some("ሳምሰንግ ስልክ፡ ዋጋ 15000 ብር።\nይደውሉ & ይዘዙ")
    );
    assert_eq!(first.views, Some(1_200));
    assert_eq!(first.sender_id, None);
    assert_eq!(
        first.photo().map(|p| p.location.as_str()),
        Some("https://cdn4.telesco.pe/file/photo_101.jpg")
    );
    assert_eq!(first.date.to_rfc3339(), "2024-03-01T09:00:00+00:00");

    // Photo-only post: no text, still has media.
    assert_eq!(msgs[1].text, None);
    assert!(msgs[1].photo().is_some());
    assert_eq!(msgs[1].views, Some(980));

    // Reply quote is not mistaken for the body; video counts as media.
    assert_eq!(msgs[2].text.as_deref(), Some("አዲስ ቪዲዮ ተለቋል"));
    assert_eq!(msgs[2].media, Some(MediaAttachment::Other));
    assert_eq!(msgs[2].views, None);
    assert_eq!(msgs[2].date.offset().local_minus_utc(), 3 * 3600);

    // Link preview counts as an attachment, like on the platform itself.
    assert_eq!(
        msgs[3].text.as_deref(),
        Some("ሙሉ ዝርዝር እዚህ ይመልከቱ shop.example.et/p/55")
    );
    assert_eq!(msgs[3].media, Some(MediaAttachment::Other));
    assert!(msgs[3].photo().is_none());
    assert_eq!(msgs[3].views, Some(45));
}

#[test]
fn page_without_posts_is_empty() {
    let msgs = parse_page("<html><body>This channel can't be displayed</body></html>").unwrap();
    assert!(msgs.is_empty());
}
