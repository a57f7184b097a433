use std::fs::File;
use std::path::Path;

use crate::error::RegionError;
use crate::parser::detail::{Amenities, Coordinates, COORD_SENTINEL};
use crate::parser::listing::Listing;

/// Output columns, fixed order. The downstream cleaning step keys on these
/// names; do not reorder.
pub const COLUMNS: [&str; 21] = [
    "pid",
    "dt",
    "url",
    "title",
    "price",
    "neighb",
    "sqft",
    "lat",
    "lng",
    "accuracy",
    "body_text",
    "furnished",
    "laundry_known",
    "laundry_onpremises",
    "laundry_inunit",
    "room_known",
    "private_room",
    "bath_known",
    "private_bath",
    "parking_known",
    "onsite_parking",
];

/// Append-only CSV sink for one region. The header goes out at open and
/// every row is flushed as written, so the file is header + zero or more
/// complete rows at any instant, even if the region dies mid-crawl.
pub struct CsvSink {
    writer: csv::Writer<File>,
}

impl CsvSink {
    pub fn create(path: &Path) -> Result<Self, RegionError> {
        let file = File::create(path)?;
        let mut writer = csv::WriterBuilder::new().from_writer(file);
        writer.write_record(COLUMNS)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    /// Write one fully assembled row. Callers only get here once every
    /// enrichment succeeded; a partial row is never emitted.
    pub fn write_row(
        &mut self,
        listing: &Listing,
        coords: Option<&Coordinates>,
        body_text: &str,
        amenities: &Amenities,
    ) -> Result<(), RegionError> {
        let (lat, lng, accuracy) = match coords {
            Some(c) => (c.lat.as_str(), c.lng.as_str(), c.accuracy.as_str()),
            None => (COORD_SENTINEL, COORD_SENTINEL, COORD_SENTINEL),
        };
        let sqft = listing.sqft.unwrap_or(0).to_string();

        self.writer.write_record([
            listing.pid.as_str(),
            listing.posted_raw.as_str(),
            listing.url.as_str(),
            listing.title.as_str(),
            listing.price.as_deref().unwrap_or(""),
            listing.neighb.as_deref().unwrap_or(""),
            sqft.as_str(),
            lat,
            lng,
            accuracy,
            body_text,
            flag(amenities.furnished),
            flag(amenities.laundry_known),
            flag(amenities.laundry_onpremises),
            flag(amenities.laundry_inunit),
            flag(amenities.room_known),
            flag(amenities.private_room),
            flag(amenities.bath_known),
            flag(amenities.private_bath),
            flag(amenities.parking_known),
            flag(amenities.onsite_parking),
        ])?;
        self.writer.flush()?;
        Ok(())
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn sample_listing() -> Listing {
        Listing {
            pid: "7001".into(),
            posted_at: NaiveDateTime::parse_from_str("2025-01-15 11:42", "%Y-%m-%d %H:%M")
                .unwrap(),
            posted_raw: "2025-01-15 11:42".into(),
            url: "http://sfbay.example.org/roo/7001.html".into(),
            title: "Sunny room".into(),
            price: None,
            neighb: None,
            sqft: None,
        }
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("rental_scraper_sink_{}_{}.csv", name, std::process::id()))
    }

    #[test]
    fn header_then_rows_with_fixed_arity() {
        let path = temp_path("arity");
        let mut sink = CsvSink::create(&path).unwrap();
        sink.write_row(&sample_listing(), None, "body, with commas\nand a newline", &Amenities::default())
            .unwrap();
        drop(sink);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.headers().unwrap().len(), 21);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 21);
        // Missing optionals: empty price/neighb, zero sqft, sentinel coords.
        assert_eq!(&rows[0][4], "");
        assert_eq!(&rows[0][5], "");
        assert_eq!(&rows[0][6], "0");
        assert_eq!(&rows[0][7], "99");
        assert_eq!(&rows[0][8], "99");
        assert_eq!(&rows[0][9], "99");
        assert_eq!(&rows[0][10], "body, with commas\nand a newline");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn flags_serialize_upper_case() {
        let path = temp_path("flags");
        let mut sink = CsvSink::create(&path).unwrap();
        let amenities = Amenities {
            furnished: true,
            ..Amenities::default()
        };
        let coords = Coordinates {
            lat: "37.77".into(),
            lng: "-122.42".into(),
            accuracy: "10".into(),
        };
        sink.write_row(&sample_listing(), Some(&coords), "", &amenities).unwrap();
        drop(sink);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[7], "37.77");
        assert_eq!(&row[11], "TRUE");
        assert_eq!(&row[12], "FALSE");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn file_is_valid_after_header_alone() {
        let path = temp_path("header");
        let sink = CsvSink::create(&path).unwrap();
        drop(sink);
        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(
            reader.headers().unwrap().iter().collect::<Vec<_>>(),
            COLUMNS.to_vec()
        );
        assert_eq!(reader.records().count(), 0);
        std::fs::remove_file(&path).ok();
    }
}
