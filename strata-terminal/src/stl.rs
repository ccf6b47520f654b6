/// STL loading for layer patches, binary and ASCII formats
use std::collections::HashSet;
use std::path::Path;

use nalgebra::Point3;
use nom::{
    bytes::complete::{tag, take},
    character::complete::{multispace0, multispace1, not_line_ending},
    multi::{count, many0},
    number::complete::{double, le_f32, le_u16, le_u32},
    sequence::{preceded, tuple},
    IResult,
};
use thiserror::Error;

/// Errors raised while reading an STL patch
#[derive(Debug, Error)]
pub enum StlError {
    #[error("failed to read STL file: {0}")]
    Io(#[from] std::io::Error),

    #[error("file too small to be a valid STL ({0} bytes)")]
    TooSmall(usize),

    #[error("binary STL declares {declared} triangles but holds {found}")]
    Truncated { declared: usize, found: usize },

    #[error("failed to parse ASCII STL: {0}")]
    Ascii(String),
}

type Facet = [Point3<f64>; 3];

/// Read an STL file and return its distinct vertex positions
pub fn load_stl(path: &Path) -> Result<Vec<Point3<f64>>, StlError> {
    let data = std::fs::read(path)?;
    parse_stl(&data)
}

/// Detect and parse STL data (binary or ASCII)
///
/// Shared corners are reported once so every corner weighs the same
/// in later vertex statistics.
pub fn parse_stl(data: &[u8]) -> Result<Vec<Point3<f64>>, StlError> {
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(vertices) = parse_ascii_stl(text) {
                return Ok(vertices);
            }
        }
    }

    parse_binary_stl(data)
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Vec<Point3<f64>>, StlError> {
    if data.len() < 84 {
        return Err(StlError::TooSmall(data.len()));
    }

    let (body, declared) = binary_header(data).map_err(|_| StlError::TooSmall(data.len()))?;
    let declared = declared as usize;
    let found = body.len() / 50;
    if found < declared {
        return Err(StlError::Truncated { declared, found });
    }

    let (_, facets) = count(binary_facet, declared)(body)
        .map_err(|_| StlError::Truncated { declared, found })?;
    Ok(distinct_vertices(&facets))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Vec<Point3<f64>>, StlError> {
    match ascii_solid(input) {
        Ok((_, facets)) => Ok(distinct_vertices(&facets)),
        Err(e) => Err(StlError::Ascii(format!("{e:?}"))),
    }
}

fn binary_header(input: &[u8]) -> IResult<&[u8], u32> {
    // 80-byte header, then the triangle count
    preceded(take(80usize), le_u32)(input)
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Facet> {
    let (input, _normal) = take(12usize)(input)?;
    let (input, a) = binary_vertex(input)?;
    let (input, b) = binary_vertex(input)?;
    let (input, c) = binary_vertex(input)?;
    let (input, _attributes) = le_u16(input)?;
    Ok((input, [a, b, c]))
}

fn binary_vertex(input: &[u8]) -> IResult<&[u8], Point3<f64>> {
    let (input, (x, y, z)) = tuple((le_f32, le_f32, le_f32))(input)?;
    Ok((input, Point3::new(f64::from(x), f64::from(y), f64::from(z))))
}

fn ascii_solid(input: &str) -> IResult<&str, Vec<Facet>> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _name) = not_line_ending(input)?;
    let (input, facets) = many0(ascii_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    Ok((input, facets))
}

fn ascii_facet(input: &str) -> IResult<&str, Facet> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, _normal) = ascii_vector(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, a) = ascii_vertex(input)?;
    let (input, b) = ascii_vertex(input)?;
    let (input, c) = ascii_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;
    Ok((input, [a, b, c]))
}

fn ascii_vertex(input: &str) -> IResult<&str, Point3<f64>> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    ascii_vector(input)
}

fn ascii_vector(input: &str) -> IResult<&str, Point3<f64>> {
    let (input, _) = multispace0(input)?;
    let (input, x) = double(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = double(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = double(input)?;
    Ok((input, Point3::new(x, y, z)))
}

fn distinct_vertices(facets: &[Facet]) -> Vec<Point3<f64>> {
    let mut seen = HashSet::new();
    facets
        .iter()
        .flatten()
        .filter(|p| seen.insert([p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "solid patch
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
  facet normal 0 0 1
    outer loop
      vertex 1 0 0
      vertex 1 1 0
      vertex 0 1 0
    endloop
  endfacet
endsolid patch
";

    fn binary(facets: &[[[f32; 3]; 3]], declared: u32) -> Vec<u8> {
        let mut data = vec![0u8; 80];
        data.extend_from_slice(&declared.to_le_bytes());
        for facet in facets {
            data.extend_from_slice(&[0u8; 12]);
            for vertex in facet {
                for c in vertex {
                    data.extend_from_slice(&c.to_le_bytes());
                }
            }
            data.extend_from_slice(&0u16.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_parse_binary_header() {
        let data = binary(&[], 0);
        let vertices = parse_binary_stl(&data).unwrap();
        assert!(vertices.is_empty());
    }

    #[test]
    fn test_parse_binary_triangle() {
        let data = binary(&[[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, -3.5, 1.0]]], 1);
        let vertices = parse_stl(&data).unwrap();
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[2], Point3::new(0.0, -3.5, 1.0));
    }

    #[test]
    fn test_binary_errors() {
        assert!(matches!(parse_binary_stl(&[0u8; 10]), Err(StlError::TooSmall(10))));

        let data = binary(&[[[0.0; 3]; 3]], 2);
        assert!(matches!(
            parse_binary_stl(&data),
            Err(StlError::Truncated { declared: 2, found: 1 })
        ));
    }

    #[test]
    fn test_parse_ascii_dedups_corners() {
        let vertices = parse_stl(TRIANGLE.as_bytes()).unwrap();
        assert_eq!(vertices.len(), 4);
        assert!(vertices.contains(&Point3::new(1.0, 1.0, 0.0)));
    }

    #[test]
    fn test_ascii_error() {
        assert!(matches!(
            parse_ascii_stl("solid broken\n facet normal 0 0\n"),
            Err(StlError::Ascii(_))
        ));
    }
}
