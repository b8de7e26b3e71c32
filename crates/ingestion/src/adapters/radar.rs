//! Radar point cloud adapter (`.pcd`, PCD v0.7 binary)
//!
//! The ASCII header declares the field layout; the binary body is kept as
//! is and described with matching point fields.

use bytes::Bytes;
use contracts::{PointCloudData, PointFieldDesc, PointFieldType, SensorPayload};

use crate::error::{IngestionError, Result};

#[derive(Debug, Default)]
struct PcdHeader {
    fields: Vec<String>,
    sizes: Vec<u32>,
    types: Vec<char>,
    counts: Vec<u32>,
    points: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    data: Option<String>,
}

fn datatype(kind: char, size: u32) -> Result<PointFieldType> {
    match (kind, size) {
        ('I', 1) => Ok(PointFieldType::Int8),
        ('U', 1) => Ok(PointFieldType::UInt8),
        ('I', 2) => Ok(PointFieldType::Int16),
        ('U', 2) => Ok(PointFieldType::UInt16),
        ('I', 4) => Ok(PointFieldType::Int32),
        ('U', 4) => Ok(PointFieldType::UInt32),
        ('F', 4) => Ok(PointFieldType::Float32),
        ('F', 8) => Ok(PointFieldType::Float64),
        _ => Err(IngestionError::pcd(format!("unsupported type {kind}{size}"))),
    }
}

fn parse_u32s(values: &[&str], key: &str) -> Result<Vec<u32>> {
    values
        .iter()
        .map(|v| {
            v.parse::<u32>()
                .map_err(|_| IngestionError::pcd(format!("{key}: invalid value '{v}'")))
        })
        .collect()
}

/// Split header lines from the body; returns `(header, body offset)`
fn parse_header(raw: &[u8]) -> Result<(PcdHeader, usize)> {
    let mut header = PcdHeader::default();
    let mut offset = 0usize;

    while header.data.is_none() {
        let rest = raw
            .get(offset..)
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| IngestionError::pcd("header ends before DATA"))?;
        let line_len = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| IngestionError::pcd("unterminated header line"))?;
        let line = std::str::from_utf8(&rest[..line_len])
            .map_err(|_| IngestionError::pcd("header is not ascii"))?
            .trim();
        offset += line_len + 1;

        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let key = parts.next().unwrap_or_default();
        let values: Vec<&str> = parts.collect();
        match key {
            "VERSION" | "VIEWPOINT" => {}
            "FIELDS" => header.fields = values.iter().map(|s| s.to_string()).collect(),
            "SIZE" => header.sizes = parse_u32s(&values, key)?,
            "TYPE" => {
                header.types = values
                    .iter()
                    .map(|s| s.chars().next().unwrap_or('?'))
                    .collect()
            }
            "COUNT" => header.counts = parse_u32s(&values, key)?,
            "WIDTH" => header.width = parse_u32s(&values, key)?.first().copied(),
            "HEIGHT" => header.height = parse_u32s(&values, key)?.first().copied(),
            "POINTS" => header.points = parse_u32s(&values, key)?.first().copied(),
            "DATA" => header.data = Some(values.first().copied().unwrap_or_default().to_string()),
            other => return Err(IngestionError::pcd(format!("unknown header key '{other}'"))),
        }
    }

    Ok((header, offset))
}

/// Decode a binary PCD file
pub fn decode(raw: Bytes) -> Result<SensorPayload> {
    let (header, body_offset) = parse_header(&raw)?;

    if header.data.as_deref() != Some("binary") {
        return Err(IngestionError::pcd(format!(
            "DATA {} not supported",
            header.data.unwrap_or_default()
        )));
    }
    let n = header.fields.len();
    if n == 0 || header.sizes.len() != n || header.types.len() != n {
        return Err(IngestionError::pcd("FIELDS/SIZE/TYPE length mismatch"));
    }
    let counts = if header.counts.is_empty() {
        vec![1; n]
    } else if header.counts.len() == n {
        header.counts.clone()
    } else {
        return Err(IngestionError::pcd("COUNT length mismatch"));
    };

    let mut fields = Vec::with_capacity(n);
    let mut offset = 0u32;
    for i in 0..n {
        let datatype = datatype(header.types[i], header.sizes[i])?;
        fields.push(PointFieldDesc::new(&header.fields[i], offset, datatype, counts[i]));
        offset = header.sizes[i]
            .checked_mul(counts[i])
            .and_then(|width| offset.checked_add(width))
            .ok_or_else(|| IngestionError::pcd("point step overflows u32"))?;
    }
    let point_step = offset;

    let num_points = match (header.points, header.width) {
        (Some(points), _) => points,
        (None, Some(width)) => width
            .checked_mul(header.height.unwrap_or(1))
            .ok_or_else(|| IngestionError::pcd("WIDTH * HEIGHT overflows u32"))?,
        (None, None) => return Err(IngestionError::pcd("missing POINTS/WIDTH")),
    };

    let body = raw.slice(body_offset..);
    let expected = (point_step as usize)
        .checked_mul(num_points as usize)
        .ok_or_else(|| IngestionError::pcd("body size overflows usize"))?;
    if body.len() < expected {
        return Err(IngestionError::LengthMismatch {
            expected,
            actual: body.len(),
        });
    }

    Ok(SensorPayload::PointCloud(PointCloudData {
        num_points,
        point_step,
        fields,
        data: body.slice(..expected),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcd(points: u32, body: &[u8]) -> Bytes {
        let mut raw = format!(
            "# .PCD v0.7 - Point Cloud Data file format\nVERSION 0.7\nFIELDS x y z dyn_prop id\n\
             SIZE 4 4 4 1 2\nTYPE F F F I I\nCOUNT 1 1 1 1 1\nWIDTH {points}\nHEIGHT 1\n\
             VIEWPOINT 0 0 0 1 0 0 0\nPOINTS {points}\nDATA binary\n"
        )
        .into_bytes();
        raw.extend_from_slice(body);
        Bytes::from(raw)
    }

    fn point(x: f32, y: f32, z: f32, dyn_prop: i8, id: i16) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&x.to_le_bytes());
        out.extend_from_slice(&y.to_le_bytes());
        out.extend_from_slice(&z.to_le_bytes());
        out.extend_from_slice(&dyn_prop.to_le_bytes());
        out.extend_from_slice(&id.to_le_bytes());
        out
    }

    #[test]
    fn test_decode_radar_layout() {
        let mut body = point(10.0, 1.0, 0.0, 3, 7);
        body.extend(point(20.0, -2.0, 0.0, 1, 8));
        let SensorPayload::PointCloud(cloud) = decode(pcd(2, &body)).unwrap() else {
            panic!("expected point cloud");
        };
        assert_eq!(cloud.num_points, 2);
        assert_eq!(cloud.point_step, 15);
        assert_eq!(cloud.fields[3].datatype, PointFieldType::Int8);
        assert_eq!(cloud.fields[4].offset, 13);
        assert_eq!(cloud.fields[4].datatype, PointFieldType::Int16);
        let xyz: Vec<[f32; 3]> = cloud.xyz().collect();
        assert_eq!(xyz, vec![[10.0, 1.0, 0.0], [20.0, -2.0, 0.0]]);
    }

    #[test]
    fn test_short_body() {
        let body = point(10.0, 1.0, 0.0, 3, 7);
        assert!(matches!(
            decode(pcd(2, &body)),
            Err(IngestionError::LengthMismatch { expected: 30, actual: 15 })
        ));
    }

    #[test]
    fn test_ascii_data_rejected() {
        let raw = Bytes::from_static(b"FIELDS x\nSIZE 4\nTYPE F\nPOINTS 0\nDATA ascii\n");
        assert!(matches!(decode(raw), Err(IngestionError::PcdHeader { .. })));
    }

    #[test]
    fn test_missing_data_line() {
        let raw = Bytes::from_static(b"FIELDS x\nSIZE 4\n");
        assert!(decode(raw).is_err());
    }

    #[test]
    fn test_oversized_count_is_header_error() {
        let raw = Bytes::from_static(
            b"FIELDS x y\nSIZE 4 4\nTYPE F F\nCOUNT 1 1073741824\nPOINTS 1\nDATA binary\n",
        );
        assert!(matches!(decode(raw), Err(IngestionError::PcdHeader { .. })));
    }

    #[test]
    fn test_oversized_width_height_is_header_error() {
        let raw = Bytes::from_static(
            b"FIELDS x\nSIZE 4\nTYPE F\nWIDTH 65536\nHEIGHT 65536\nDATA binary\n",
        );
        assert!(matches!(decode(raw), Err(IngestionError::PcdHeader { .. })));
    }
}
