use std::collections::BTreeMap;

use crate::cursor::{Endian, Writer};
use crate::error::{Error, Result};
use crate::reader::{ObjectIndex, ObjectInfo};

/// Object data is laid out on 8-byte boundaries relative to the data offset.
const OBJECT_ALIGNMENT: usize = 8;

/// Rebuild a serialized file with some objects' data replaced.
///
/// Everything up to the first replaced object (header, metadata, padding and
/// the objects laid out before it) is copied verbatim. From there on, objects
/// are written in their original order on 8-byte boundaries and their table
/// rows are rewritten. The header's file size is updated last.
///
/// With no replacements the input is returned unchanged.
pub fn rebuild(data: &[u8], index: &ObjectIndex, replacements: &BTreeMap<i64, Vec<u8>>) -> Result<Vec<u8>> {
    let mut order: Vec<&ObjectInfo> = index.objects().iter().collect();
    order.sort_by_key(|o| o.byte_start);

    let Some(first_changed) = order.iter().position(|o| replacements.contains_key(&o.path_id)) else {
        return Ok(data.to_vec());
    };

    let header = index.header();
    let data_offset = header.data_offset as usize;
    let keep_until = data_offset + order[first_changed].byte_start as usize;
    let growth: usize = replacements.values().map(Vec::len).sum();

    let mut w = Writer::with_capacity(data.len() + growth, header.endian);
    w.write_bytes(&data[..keep_until]);

    let mut placements = Vec::with_capacity(order.len() - first_changed);
    for info in &order[first_changed..] {
        while (w.position() - data_offset) % OBJECT_ALIGNMENT != 0 {
            w.write_u8(0);
        }
        let bytes = match replacements.get(&info.path_id) {
            Some(bytes) => bytes.as_slice(),
            None => index.object_data(data, info),
        };
        let start = (w.position() - data_offset) as u64;
        placements.push((*info, start, bytes.len()));
        w.write_bytes(bytes);
    }

    // Anything after the last object (rare) is carried over as-is.
    let old_end = order
        .iter()
        .map(|o| data_offset + (o.byte_start + u64::from(o.byte_size)) as usize)
        .max()
        .unwrap_or(data_offset);
    if old_end < data.len() {
        w.write_bytes(&data[old_end..]);
    }

    for (info, start, size) in placements {
        let size = u32::try_from(size).map_err(|_| Error::Overflow {
            what: "object size",
            value: size as u64,
            version: header.version,
        })?;
        if header.has_large_offsets() {
            w.patch_u64(info.byte_start_field, start);
        } else {
            let start = u32::try_from(start).map_err(|_| Error::Overflow {
                what: "object offset",
                value: start,
                version: header.version,
            })?;
            w.patch_u32(info.byte_start_field, start);
        }
        w.patch_u32(info.byte_size_field, size);
    }

    let file_size = w.position() as u64;
    let (field, wide) = header.file_size_field();
    w.set_endian(Endian::Big);
    if wide {
        w.patch_u64(field, file_size);
    } else {
        let file_size = u32::try_from(file_size).map_err(|_| Error::Overflow {
            what: "file size",
            value: file_size,
            version: header.version,
        })?;
        w.patch_u32(field, file_size);
    }

    Ok(w.into_bytes())
}
