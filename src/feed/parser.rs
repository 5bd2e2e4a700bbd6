//! RSS channel/item decoding.
//!
//! Decodes the standard RSS 2.0 schema (title, link, description at channel
//! level; title, link, description, pubDate per item) and ignores everything
//! else, including namespaced extensions like `media:title`. Entity references
//! beyond the XML builtins are not resolved; `quick-xml` 0.37 never parses
//! `<!ENTITY>` declarations, so external-entity payloads cannot expand.

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Bounds the element path stack. RSS documents are shallow; anything deeper
/// is hostile or broken.
const MAX_ELEMENT_DEPTH: usize = 50;

/// Errors from decoding a feed document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(String),

    /// Well-formed XML, but no `<channel>` element (not an RSS document).
    #[error("no <channel> element found")]
    MissingChannel,

    /// Element nesting exceeds the safety limit.
    #[error("element nesting exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),
}

/// A decoded RSS channel.
///
/// Missing fields decode as empty strings; the ingestion pipeline maps empty
/// to absent where the storage schema allows it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Channel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<Item>,
}

/// One `<item>` from a channel, fields still raw. `pub_date` holds the
/// verbatim `<pubDate>` text; normalization happens later.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}

/// Decodes an RSS document into a [`Channel`].
///
/// Fields are captured only from direct children of `<channel>` and `<item>`,
/// so `<image><title>` cannot clobber the channel title. CDATA sections and
/// builtin XML entities are resolved; unknown entities fail the parse.
pub fn parse_channel(xml: &str) -> Result<Channel, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut channel: Option<Channel> = None;
    let mut item: Option<Item> = None;
    // Qualified names of the currently open elements, outermost first
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if path.len() >= MAX_ELEMENT_DEPTH {
                    return Err(ParseError::MaxDepthExceeded(MAX_ELEMENT_DEPTH));
                }
                let name = reader
                    .decoder()
                    .decode(e.name().as_ref())
                    .map_err(|err| ParseError::Xml(err.to_string()))?
                    .into_owned();
                match name.as_str() {
                    "channel" if channel.is_none() => channel = Some(Channel::default()),
                    "item" if channel.is_some() && item.is_none() => {
                        item = Some(Item::default());
                    }
                    _ => {}
                }
                path.push(name);
                text.clear();
            }
            Ok(Event::Text(e)) => {
                let decoded = e.unescape().map_err(|err| ParseError::Xml(err.to_string()))?;
                text.push_str(&decoded);
            }
            Ok(Event::CData(e)) => {
                let decoded = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|err| ParseError::Xml(err.to_string()))?;
                text.push_str(&decoded);
            }
            Ok(Event::End(_)) => {
                let Some(closed) = path.pop() else { continue };
                let parent = path.last().map(String::as_str);
                match (parent, closed.as_str()) {
                    (Some("item"), field) => {
                        if let Some(current) = item.as_mut() {
                            set_item_field(current, field, &text);
                        }
                    }
                    (Some("channel"), "item") => {
                        if let (Some(ch), Some(done)) = (channel.as_mut(), item.take()) {
                            ch.items.push(done);
                        }
                    }
                    (Some("channel"), field) => {
                        if let Some(ch) = channel.as_mut() {
                            set_channel_field(ch, field, &text);
                        }
                    }
                    _ => {}
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    channel.ok_or(ParseError::MissingChannel)
}

fn set_item_field(item: &mut Item, field: &str, value: &str) {
    match field {
        "title" => item.title = value.to_owned(),
        "link" => item.link = value.to_owned(),
        "description" => item.description = value.to_owned(),
        "pubDate" => item.pub_date = value.to_owned(),
        _ => {}
    }
}

fn set_channel_field(channel: &mut Channel, field: &str, value: &str) {
    match field {
        "title" => channel.title = value.to_owned(),
        "link" => channel.link = value.to_owned(),
        "description" => channel.description = value.to_owned(),
        _ => {}
    }
}
