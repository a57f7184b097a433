use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::error::FetchError;

static MAP_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div#map").unwrap());
static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("section#postingbody").unwrap());
static ATTR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.attrgroup span").unwrap());

/// Placeholder written for each coordinate field when a posting renders no
/// map, keeping row arity constant in the output.
pub const COORD_SENTINEL: &str = "99";

/// Map coordinates as printed in the page's attributes; kept as strings and
/// written through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub lat: String,
    pub lng: String,
    pub accuracy: String,
}

/// Amenity flags derived from the posting's descriptor spans. `*_known`
/// means the attribute was mentioned at all; a `false` elsewhere never
/// proves absence, only that the poster didn't say.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Amenities {
    pub furnished: bool,
    pub laundry_known: bool,
    pub laundry_onpremises: bool,
    pub laundry_inunit: bool,
    pub room_known: bool,
    pub private_room: bool,
    pub bath_known: bool,
    pub private_bath: bool,
    pub parking_known: bool,
    pub onsite_parking: bool,
}

const PARKING_LABELS: &[&str] = &[
    "carport",
    "attached garage",
    "off-street parking",
    "detached garage",
    "street parking",
    "valet parking",
    "no parking",
];

const ONSITE_PARKING_LABELS: &[&str] = &[
    "carport",
    "attached garage",
    "off-street parking",
    "detached garage",
    "valet parking",
];

/// Pull lat/lng/accuracy off the map container. `Ok(None)` when the page
/// has no map at all (poster withheld location); an error when the map is
/// there but incomplete.
pub fn parse_coordinates(html: &str) -> Result<Option<Coordinates>, FetchError> {
    let doc = Html::parse_document(html);
    let Some(map) = doc.select(&MAP_SEL).next() else {
        return Ok(None);
    };
    let attr = |name: &'static str| {
        map.value()
            .attr(name)
            .map(str::to_string)
            .ok_or(FetchError::MissingNode(name))
    };
    Ok(Some(Coordinates {
        lat: attr("data-latitude")?,
        lng: attr("data-longitude")?,
        accuracy: attr("data-accuracy")?,
    }))
}

/// Concatenate the posting body's direct text nodes and trim. Nested
/// markup (contact blurbs and such) is skipped on purpose.
pub fn parse_body_text(html: &str) -> Result<String, FetchError> {
    let doc = Html::parse_document(html);
    let section = doc
        .select(&BODY_SEL)
        .next()
        .ok_or(FetchError::MissingNode("postingbody"))?;
    let body: String = section
        .children()
        .filter_map(|node| node.value().as_text().map(|t| &*t.text))
        .collect();
    Ok(body.trim().to_string())
}

/// Scan the descriptor spans and derive the ten amenity flags. A page with
/// no spans yields all-false, not an error.
pub fn parse_amenities(html: &str) -> Amenities {
    let doc = Html::parse_document(html);
    let spans: Vec<String> = doc
        .select(&ATTR_SEL)
        .map(|span| span.text().collect::<String>())
        .collect();
    derive_flags(&spans)
}

/// The fixed rule table over the descriptor vocabulary: mention establishes
/// `known`, the displayed flag then layers possibility against explicit
/// negation.
pub fn derive_flags(spans: &[String]) -> Amenities {
    let has = |needle: &str| spans.iter().any(|s| s.contains(needle));

    let furnished = has("furnished");

    let laundry_known = has("laundry") || has("w/d");
    let no_laundry_onsite = has("no laundry") || has("hookups");
    let laundry_inunit = has("w/d in unit");
    let laundry_onpremises = laundry_known && !no_laundry_onsite && !laundry_inunit;

    let room_known = has("room");
    let private_room = room_known && has("private room");

    let bath_known = has("bath");
    // "no private bath" contains "private bath", so the negation must win.
    let private_bath = has("private bath") && !has("no private bath");

    let parking_known = PARKING_LABELS.iter().any(|label| has(label));
    let parking_possible = ONSITE_PARKING_LABELS.iter().any(|label| has(label));
    // "street parking" also matches inside "off-street parking"; the
    // historical rule table behaves this way and downstream data depends
    // on it, so it stays.
    let no_onsite_parking = has("no parking") || has("street parking");
    let onsite_parking = parking_possible && !no_onsite_parking;

    Amenities {
        furnished,
        laundry_known,
        laundry_onpremises,
        laundry_inunit,
        room_known,
        private_room,
        bath_known,
        private_bath,
        parking_known,
        onsite_parking,
    }
}
