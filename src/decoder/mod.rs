// src/decoder/mod.rs

// Decodes the collision detector's XML diagnostic payload into model types.
// Payload schema: a <cd> root holding <c> collision records (15 numeric
// attributes) and <l> link records with nested <g> geometry records.
// A missing or non-numeric required attribute aborts the whole payload;
// the caller keeps its previously cached state in that case.

use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::model::{Collision, GeomShape, Link, LinkGeometry};
use crate::ColvisError;

type Result<T> = std::result::Result<T, ColvisError>;

/// A fully decoded payload: the current collision pairs plus every link
/// record the payload carried.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadUpdate {
    /// Collision pairs; replaces the cached list wholesale.
    pub collisions: Vec<Collision>,
    /// Link records; merged into the cache, first seen wins.
    pub links: Vec<Link>,
}

/// Parses one collision payload document.
pub fn parse_payload(xml: &str) -> Result<PayloadUpdate> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut update: Option<PayloadUpdate> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"cd" => {
                update = Some(parse_cd(&mut reader)?);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ColvisError::XmlParse(e.to_string())),
        }
        buf.clear();
    }

    update.ok_or_else(|| ColvisError::XmlParse("missing <cd> root element".into()))
}

/// Parses the children of the <cd> element.
///
/// The root's `col_count` attribute is redundant with the record count and is
/// ignored. Unknown child elements are skipped.
fn parse_cd(reader: &mut Reader<&[u8]>) -> Result<PayloadUpdate> {
    let mut update = PayloadUpdate::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.name().as_ref() == b"c" =>
            {
                update.collisions.push(parse_collision(e)?);
            }
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"l" => {
                let link = parse_link(reader, e)?;
                update.links.push(link);
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"l" => {
                // Link without geometry records.
                update.links.push(Link {
                    idx: required_u32(e, "idx")?,
                    name: get_attribute(e, "name")?,
                    geoms: Vec::new(),
                });
            }
            Ok(Event::Start(ref e)) => {
                let name = e.name().as_ref().to_vec();
                skip_element(reader, &name)?;
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"cd" => break,
            Ok(Event::Eof) => {
                return Err(ColvisError::XmlParse("unexpected EOF in <cd>".into()))
            }
            Ok(_) => {}
            Err(e) => return Err(ColvisError::XmlParse(e.to_string())),
        }
        buf.clear();
    }

    Ok(update)
}

/// Parses one <c> collision record from its attributes.
fn parse_collision(e: &BytesStart) -> Result<Collision> {
    Ok(Collision {
        i1: required_u32(e, "i1")?,
        i2: required_u32(e, "i2")?,
        p1: [
            required_f64(e, "p1x")?,
            required_f64(e, "p1y")?,
            required_f64(e, "p1z")?,
        ]
        .into(),
        p2: [
            required_f64(e, "p2x")?,
            required_f64(e, "p2y")?,
            required_f64(e, "p2z")?,
        ]
        .into(),
        dist: required_f64(e, "d")?,
        n1: [
            required_f64(e, "n1x")?,
            required_f64(e, "n1y")?,
            required_f64(e, "n1z")?,
        ]
        .into(),
        n2: [
            required_f64(e, "n2x")?,
            required_f64(e, "n2y")?,
            required_f64(e, "n2z")?,
        ]
        .into(),
    })
}

/// Parses one <l> link element and its <g> children.
fn parse_link(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Link> {
    let mut link = Link {
        idx: required_u32(start, "idx")?,
        name: get_attribute(start, "name")?,
        geoms: Vec::new(),
    };
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.name().as_ref() == b"g" =>
            {
                if let Some(geom) = parse_geometry(e)? {
                    link.geoms.push(geom);
                }
            }
            Ok(Event::Start(ref e)) => {
                let name = e.name().as_ref().to_vec();
                skip_element(reader, &name)?;
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"l" => break,
            Ok(Event::Eof) => {
                return Err(ColvisError::XmlParse("unexpected EOF in <l>".into()))
            }
            Ok(_) => {}
            Err(e) => return Err(ColvisError::XmlParse(e.to_string())),
        }
        buf.clear();
    }

    Ok(link)
}

/// Parses one <g> geometry record.
///
/// Returns `None` for shapes this visualizer does not draw (the detector also
/// serializes CONVEX, TRIANGLE, OCTOMAP and UNDEFINED entries).
fn parse_geometry(e: &BytesStart) -> Result<Option<LinkGeometry>> {
    let shape = match get_attribute_opt(e, "type").as_deref() {
        Some("SPHERE") => GeomShape::Sphere {
            radius: required_f64(e, "r")?,
        },
        Some("CAPSULE") => GeomShape::Capsule {
            radius: required_f64(e, "r")?,
            length: required_f64(e, "l")?,
        },
        _ => return Ok(None),
    };

    let translation = Translation3::new(
        required_f64(e, "x")?,
        required_f64(e, "y")?,
        required_f64(e, "z")?,
    );
    let rotation = UnitQuaternion::from_quaternion(Quaternion::new(
        required_f64(e, "qw")?,
        required_f64(e, "qx")?,
        required_f64(e, "qy")?,
        required_f64(e, "qz")?,
    ));

    Ok(Some(LinkGeometry {
        shape,
        origin: Isometry3::from_parts(translation, rotation),
    }))
}

/// Gets a required attribute value.
fn get_attribute(e: &BytesStart, name: &'static str) -> Result<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == name.as_bytes() {
            return String::from_utf8(attr.value.to_vec())
                .map_err(|_| ColvisError::invalid_attribute(name, &element_name(e)));
        }
    }
    Err(ColvisError::missing_attribute(name, &element_name(e)))
}

/// Gets an optional attribute value.
fn get_attribute_opt(e: &BytesStart, name: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == name.as_bytes() {
            return String::from_utf8(attr.value.to_vec()).ok();
        }
    }
    None
}

/// Parses a required floating-point attribute.
fn required_f64(e: &BytesStart, name: &'static str) -> Result<f64> {
    get_attribute(e, name)?
        .parse()
        .map_err(|_| ColvisError::invalid_attribute(name, &element_name(e)))
}

/// Parses a required integer attribute.
fn required_u32(e: &BytesStart, name: &'static str) -> Result<u32> {
    get_attribute(e, name)?
        .parse()
        .map_err(|_| ColvisError::invalid_attribute(name, &element_name(e)))
}

/// Element name for error messages.
fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

/// Skips an element and all its children.
fn skip_element(reader: &mut Reader<&[u8]>, name: &[u8]) -> Result<()> {
    let mut buf = Vec::new();
    let mut depth = 1;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == name => depth += 1,
            Ok(Event::End(ref e)) if e.name().as_ref() == name => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ColvisError::XmlParse(e.to_string())),
        }
        buf.clear();
    }

    Ok(())
}
