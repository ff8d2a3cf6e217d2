// src/ingest/feed.rs
//! Feed normalizer: RSS `<item>` / Atom `<entry>` documents into
//! [`NormalizedItem`]s.
//!
//! Uses quick-xml's streaming reader rather than serde structs so that
//! loosely structured feeds (mismatched end tags, unknown HTML entities,
//! extra namespaces, links in `href` attributes) still yield items. A reader
//! error mid-document stops parsing but keeps what was already collected.

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::types::NormalizedItem;
use super::{normalize_text, parse_published};

/// Entries considered per document (and per topic search).
pub const MAX_ITEMS_PER_SOURCE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Item,
    Entry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    PubDate,
    Published,
}

/// Fields as found in the document, before validation.
#[derive(Debug, Default)]
struct RawEntry {
    title: Option<String>,
    link_text: Option<String>,
    link_href: Option<String>,
    pub_date: Option<String>,
    published: Option<String>,
}

impl RawEntry {
    fn has(&self, field: Field) -> bool {
        match field {
            Field::Title => self.title.is_some(),
            Field::Link => self.link_text.is_some(),
            Field::PubDate => self.pub_date.is_some(),
            Field::Published => self.published.is_some(),
        }
    }

    fn set(&mut self, field: Field, text: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link_text,
            Field::PubDate => &mut self.pub_date,
            Field::Published => &mut self.published,
        };
        *slot = Some(text);
    }

    fn link(&self) -> Option<String> {
        let text = self
            .link_text
            .as_deref()
            .map(|t| html_escape::decode_html_entities(t).trim().to_string())
            .filter(|t| !t.is_empty());
        text.or_else(|| {
            self.link_href
                .as_deref()
                .map(|h| html_escape::decode_html_entities(h).trim().to_string())
                .filter(|h| !h.is_empty())
        })
    }

    fn into_item(self, source_name: &str, now: DateTime<Utc>) -> Option<NormalizedItem> {
        let Some(title) = self.title.as_deref().map(normalize_text) else {
            tracing::debug!(target: "ingest", source = source_name, "entry without title");
            return None;
        };
        let Some(link) = self.link() else {
            tracing::debug!(target: "ingest", source = source_name, "entry without link");
            return None;
        };
        let published_at = self
            .pub_date
            .as_deref()
            .or(self.published.as_deref())
            .and_then(parse_published)
            .unwrap_or(now);
        NormalizedItem::new(&title, &link, published_at, source_name)
    }
}

fn field_for(name: &[u8]) -> Option<Field> {
    match name {
        b"title" => Some(Field::Title),
        b"link" => Some(Field::Link),
        b"pubDate" => Some(Field::PubDate),
        b"published" => Some(Field::Published),
        _ => None,
    }
}

fn entry_kind(name: &[u8]) -> Option<EntryKind> {
    match name {
        b"item" => Some(EntryKind::Item),
        b"entry" => Some(EntryKind::Entry),
        _ => None,
    }
}

fn href_of(e: &BytesStart<'_>) -> Option<String> {
    e.try_get_attribute("href")
        .ok()
        .flatten()
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Walks the document and collects raw entries of both conventions, at most
/// `cap` of each.
///
/// Entries close on their own end tag or when the next sibling entry opens,
/// so an unclosed element inside one entry cannot swallow the rest.
struct Collector {
    cap: usize,
    items: Vec<RawEntry>,
    entries: Vec<RawEntry>,
    current: Option<(EntryKind, RawEntry)>,
    /// Field being captured and open elements inside it.
    capture: Option<(Field, usize, String)>,
}

impl Collector {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            items: Vec::new(),
            entries: Vec::new(),
            current: None,
            capture: None,
        }
    }

    fn items_full(&self) -> bool {
        self.items.len() >= self.cap
    }

    fn open_kind(&self) -> Option<EntryKind> {
        self.current.as_ref().map(|(kind, _)| *kind)
    }

    fn start(&mut self, e: &BytesStart<'_>) {
        let local = e.local_name();
        let name = local.as_ref();
        match (self.open_kind(), entry_kind(name)) {
            (None, Some(kind)) => {
                self.current = Some((kind, RawEntry::default()));
                return;
            }
            (None, None) => return,
            (Some(open), Some(kind)) if open == kind => {
                self.close_entry();
                self.current = Some((kind, RawEntry::default()));
                return;
            }
            _ => {}
        }
        if let Some((_, depth, _)) = self.capture.as_mut() {
            *depth += 1;
            return;
        }
        let Some((_, entry)) = self.current.as_mut() else {
            return;
        };
        if let Some(field) = field_for(name).filter(|f| !entry.has(*f)) {
            if field == Field::Link {
                entry.link_href = href_of(e);
            }
            self.capture = Some((field, 0, String::new()));
        }
    }

    fn empty(&mut self, e: &BytesStart<'_>) {
        if self.capture.is_some() {
            return;
        }
        let local = e.local_name();
        let Some((_, entry)) = self.current.as_mut() else {
            return;
        };
        if let Some(field) = field_for(local.as_ref()).filter(|f| !entry.has(*f)) {
            if field == Field::Link {
                entry.link_href = href_of(e);
            }
            entry.set(field, String::new());
        }
    }

    fn text(&mut self, raw: &str) {
        if let Some((_, _, buf)) = self.capture.as_mut() {
            buf.push_str(raw);
        }
    }

    fn end(&mut self, name: &[u8]) {
        let Some(open) = self.open_kind() else {
            return;
        };
        if entry_kind(name) == Some(open) {
            self.close_entry();
            return;
        }
        let Some((field, depth)) = self.capture.as_ref().map(|(f, d, _)| (*f, *d)) else {
            return;
        };
        if depth > 0 && field_for(name) != Some(field) {
            if let Some((_, d, _)) = self.capture.as_mut() {
                *d -= 1;
            }
            return;
        }
        self.finish_capture();
    }

    fn finish_capture(&mut self) {
        if let (Some((field, _, buf)), Some((_, entry))) =
            (self.capture.take(), self.current.as_mut())
        {
            entry.set(field, buf);
        }
    }

    fn close_entry(&mut self) {
        self.finish_capture();
        if let Some((kind, entry)) = self.current.take() {
            let list = match kind {
                EntryKind::Item => &mut self.items,
                EntryKind::Entry => &mut self.entries,
            };
            if list.len() < self.cap {
                list.push(entry);
            }
        }
    }

    /// RSS items win whenever the document has any; never mixed.
    fn finish(self) -> Vec<RawEntry> {
        if self.items.is_empty() {
            self.entries
        } else {
            self.items
        }
    }
}

/// Parse one syndication document. Items are not yet recency-filtered and
/// carry the `"General"` topic. Entries without a title or link are skipped;
/// a missing or unparseable date becomes `now`.
pub fn parse_feed(body: &[u8], source_name: &str, now: DateTime<Utc>) -> Vec<NormalizedItem> {
    parse_feed_capped(body, source_name, now, MAX_ITEMS_PER_SOURCE)
}

fn parse_feed_capped(
    body: &[u8],
    source_name: &str,
    now: DateTime<Utc>,
    cap: usize,
) -> Vec<NormalizedItem> {
    let t0 = std::time::Instant::now();

    let mut reader = Reader::from_reader(body);
    reader.config_mut().check_end_names = false;

    let mut col = Collector::new(cap);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => col.start(&e),
            Ok(Event::Empty(e)) => col.empty(&e),
            Ok(Event::Text(t)) => col.text(&String::from_utf8_lossy(&t)),
            Ok(Event::CData(c)) => col.text(&String::from_utf8_lossy(&c)),
            Ok(Event::End(e)) => {
                col.end(e.local_name().as_ref());
                if col.items_full() {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    source = source_name,
                    position = reader.buffer_position(),
                    error = %e,
                    "feed markup error, keeping entries parsed so far"
                );
                break;
            }
        }
        buf.clear();
    }

    let out: Vec<NormalizedItem> = col
        .finish()
        .into_iter()
        .filter_map(|raw| raw.into_item(source_name, now))
        .collect();

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    counter!("ingest_items_total").increment(out.len() as u64);
    out
}

/// `true` when the body is well-formed XML whose root element is `rss` or
/// `feed`.
pub fn is_feed_document(body: &[u8]) -> bool {
    let mut reader = Reader::from_reader(body);
    let mut buf = Vec::new();
    let mut root_ok = None;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if root_ok.is_none() => {
                let local = e.local_name();
                root_ok = Some(matches!(local.as_ref(), b"rss" | b"feed"));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return false,
        }
        buf.clear();
    }
    root_ok.unwrap_or(false)
}
