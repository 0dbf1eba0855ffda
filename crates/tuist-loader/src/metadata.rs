//! Reads architectures, linking and UUIDs straight from Mach-O headers
//!
//! Handles thin Mach-O files (32 and 64 bit, either byte order), universal
//! ("fat") binaries, and static `ar` archives whose first member after the
//! symbol table is an object file.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use tuist_graph::{BinaryArchitecture, BinaryLinking, FileHandling};

use crate::error::LoaderError;

/// What the loaders need to know about a precompiled binary.
pub trait BinaryInspecting: Send + Sync {
    fn architectures(&self, binary: &Path) -> Result<Vec<BinaryArchitecture>, LoaderError>;
    fn linking(&self, binary: &Path) -> Result<BinaryLinking, LoaderError>;
    /// UUIDs of every slice, used to find the matching `.bcsymbolmap` files.
    fn uuids(&self, binary: &Path) -> Result<BTreeSet<Uuid>, LoaderError>;
}

const MH_MAGIC: u32 = 0xfeed_face;
const MH_CIGAM: u32 = 0xcefa_edfe;
const MH_MAGIC_64: u32 = 0xfeed_facf;
const MH_CIGAM_64: u32 = 0xcffa_edfe;
const FAT_MAGIC: u32 = 0xcafe_babe;
const FAT_CIGAM: u32 = 0xbeba_feca;

const MH_DYLIB: u32 = 0x6;
const LC_UUID: u32 = 0x1b;

const CPU_ARCH_ABI64: i32 = 0x0100_0000;
const CPU_ARCH_ABI64_32: i32 = 0x0200_0000;
const CPU_TYPE_X86: i32 = 7;
const CPU_TYPE_ARM: i32 = 12;
const CPU_SUBTYPE_MASK: i32 = 0x00ff_ffff;

const ARCHIVE_MAGIC: &[u8] = b"!<arch>\n";
const ARCHIVE_HEADER_SIZE: usize = 60;
const ARCHIVE_SIZE_OFFSET: usize = 48;
const ARCHIVE_EXTENDED_NAME: &str = "#1/";

type Slice = (BinaryArchitecture, BinaryLinking, Option<Uuid>);

/// [`BinaryInspecting`] that parses the binary itself instead of shelling out
/// to `lipo` or `dwarfdump`.
#[derive(Clone)]
pub struct MachOInspector {
    file_handler: Arc<dyn FileHandling>,
}

impl MachOInspector {
    pub fn new(file_handler: Arc<dyn FileHandling>) -> Self {
        MachOInspector { file_handler }
    }

    fn slices(&self, binary: &Path) -> Result<Vec<Slice>, LoaderError> {
        let bytes = self
            .file_handler
            .read(binary)
            .map_err(|_| LoaderError::MetadataNotFound(binary.to_path_buf()))?;
        parse_slices(&bytes, binary)
    }
}

impl BinaryInspecting for MachOInspector {
    fn architectures(&self, binary: &Path) -> Result<Vec<BinaryArchitecture>, LoaderError> {
        Ok(self.slices(binary)?.into_iter().map(|s| s.0).collect())
    }

    fn linking(&self, binary: &Path) -> Result<BinaryLinking, LoaderError> {
        let dynamic = self
            .slices(binary)?
            .iter()
            .any(|s| s.1 == BinaryLinking::Dynamic);
        Ok(if dynamic {
            BinaryLinking::Dynamic
        } else {
            BinaryLinking::Static
        })
    }

    fn uuids(&self, binary: &Path) -> Result<BTreeSet<Uuid>, LoaderError> {
        Ok(self.slices(binary)?.into_iter().filter_map(|s| s.2).collect())
    }
}

/// Cursor over the file with the byte order picked from the magic number.
struct Reader<'a> {
    bytes: &'a [u8],
    big_endian: bool,
}

impl Reader<'_> {
    fn u32_at(&self, offset: usize) -> Option<u32> {
        let raw: [u8; 4] = self.bytes.get(offset..offset + 4)?.try_into().ok()?;
        Some(if self.big_endian {
            u32::from_be_bytes(raw)
        } else {
            u32::from_le_bytes(raw)
        })
    }

    fn i32_at(&self, offset: usize) -> Option<i32> {
        self.u32_at(offset).map(|v| v as i32)
    }
}

fn magic_at(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(raw))
}

fn parse_slices(bytes: &[u8], binary: &Path) -> Result<Vec<Slice>, LoaderError> {
    let not_found = || LoaderError::MetadataNotFound(binary.to_path_buf());
    let magic = magic_at(bytes, 0).ok_or_else(not_found)?;

    if magic == FAT_MAGIC || magic == FAT_CIGAM {
        let reader = Reader {
            bytes,
            big_endian: magic == FAT_CIGAM,
        };
        let count = reader.u32_at(4).ok_or_else(not_found)? as usize;
        let mut slices = Vec::with_capacity(count);
        for i in 0..count {
            // fat_arch: cputype, cpusubtype, offset, size, align
            let entry = 8 + i * 20;
            let cputype = reader.i32_at(entry).ok_or_else(not_found)?;
            let cpusubtype = reader.i32_at(entry + 4).ok_or_else(not_found)?;
            let offset = reader.u32_at(entry + 8).ok_or_else(not_found)? as usize;
            match parse_mach_header(bytes, offset) {
                Some(slice) => slices.push(slice),
                None => {
                    let arch = architecture(cputype, cpusubtype)
                        .ok_or_else(|| LoaderError::ArchitecturesNotFound(binary.to_path_buf()))?;
                    slices.push((arch, BinaryLinking::Static, None));
                }
            }
        }
        return Ok(slices);
    }

    parse_mach_header(bytes, 0)
        .map(|slice| vec![slice])
        .ok_or_else(not_found)
}

/// Parses the Mach-O header at `offset`, first skipping over an `ar` archive
/// preamble if there is one.
fn parse_mach_header(bytes: &[u8], offset: usize) -> Option<Slice> {
    let offset = skip_archive_preamble(bytes, offset);
    let magic = magic_at(bytes, offset)?;
    let (is_64, big_endian) = match magic {
        MH_MAGIC => (false, false),
        MH_CIGAM => (false, true),
        MH_MAGIC_64 => (true, false),
        MH_CIGAM_64 => (true, true),
        _ => return None,
    };
    let reader = Reader { bytes, big_endian };

    let cputype = reader.i32_at(offset + 4)?;
    let cpusubtype = reader.i32_at(offset + 8)?;
    let filetype = reader.u32_at(offset + 12)?;
    let ncmds = reader.u32_at(offset + 16)?;
    let arch = architecture(cputype, cpusubtype)?;

    let mut cursor = offset + if is_64 { 32 } else { 28 };
    let mut uuid = None;
    for _ in 0..ncmds {
        let cmd = reader.u32_at(cursor)?;
        let cmdsize = reader.u32_at(cursor + 4)? as usize;
        if cmd == LC_UUID {
            let raw: [u8; 16] = bytes.get(cursor + 8..cursor + 24)?.try_into().ok()?;
            uuid = Some(Uuid::from_bytes(raw));
            break;
        }
        if cmdsize == 0 {
            break;
        }
        cursor += cmdsize;
    }

    let linking = if filetype == MH_DYLIB {
        BinaryLinking::Dynamic
    } else {
        BinaryLinking::Static
    };
    Some((arch, linking, uuid))
}

/// Returns the offset of the first object file inside an archive starting at
/// `offset`, or `offset` itself when it isn't an archive.
fn skip_archive_preamble(bytes: &[u8], offset: usize) -> usize {
    if bytes.get(offset..offset + ARCHIVE_MAGIC.len()) != Some(ARCHIVE_MAGIC) {
        return offset;
    }
    let read_decimal = |at: usize, len: usize| -> Option<usize> {
        let field = bytes.get(at..at + len)?;
        std::str::from_utf8(field).ok()?.trim().parse().ok()
    };

    // The first member is the symbol table; the object file follows it.
    let first = offset + ARCHIVE_MAGIC.len();
    let Some(symtab_size) = read_decimal(first + ARCHIVE_SIZE_OFFSET, 10) else {
        return offset;
    };
    let mut member = first + ARCHIVE_HEADER_SIZE + symtab_size;
    member += member % 2;

    let name = bytes
        .get(member..member + 16)
        .and_then(|n| std::str::from_utf8(n).ok())
        .unwrap_or_default();
    match name.strip_prefix(ARCHIVE_EXTENDED_NAME) {
        Some(len) => {
            let name_len = len.trim().parse::<usize>().unwrap_or(0);
            member + ARCHIVE_HEADER_SIZE + name_len
        }
        None => member + ARCHIVE_HEADER_SIZE,
    }
}

fn architecture(cputype: i32, cpusubtype: i32) -> Option<BinaryArchitecture> {
    let subtype = cpusubtype & CPU_SUBTYPE_MASK;
    match cputype {
        CPU_TYPE_X86 => Some(BinaryArchitecture::I386),
        t if t == CPU_TYPE_X86 | CPU_ARCH_ABI64 => Some(BinaryArchitecture::X8664),
        CPU_TYPE_ARM => match subtype {
            9 => Some(BinaryArchitecture::Armv7),
            11 => Some(BinaryArchitecture::Armv7s),
            _ => None,
        },
        t if t == CPU_TYPE_ARM | CPU_ARCH_ABI64 => match subtype {
            2 => Some(BinaryArchitecture::Arm64e),
            _ => Some(BinaryArchitecture::Arm64),
        },
        t if t == CPU_TYPE_ARM | CPU_ARCH_ABI64_32 => Some(BinaryArchitecture::Arm6432),
        _ => None,
    }
}

/// Byte builders for synthetic binaries, shared with the loader tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub const ARM64: (i32, i32) = (CPU_TYPE_ARM | CPU_ARCH_ABI64, 0);
    pub const X86_64: (i32, i32) = (CPU_TYPE_X86 | CPU_ARCH_ABI64, 3);
    pub const ARMV7: (i32, i32) = (CPU_TYPE_ARM, 9);

    /// Little-endian 64-bit Mach-O header with one `LC_UUID` command.
    pub fn macho_64(cpu: (i32, i32), dylib: bool, uuid: [u8; 16]) -> Vec<u8> {
        let mut out = Vec::new();
        for v in [
            MH_MAGIC_64,
            cpu.0 as u32,
            cpu.1 as u32,
            if dylib { MH_DYLIB } else { 0x1 },
            1,
            24,
            0,
            0,
        ] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&LC_UUID.to_le_bytes());
        out.extend_from_slice(&24u32.to_le_bytes());
        out.extend_from_slice(&uuid);
        out
    }

    /// Universal binary wrapping the given thin slices.
    pub fn fat(slices: &[((i32, i32), Vec<u8>)]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&FAT_MAGIC.to_be_bytes());
        out.extend_from_slice(&(slices.len() as u32).to_be_bytes());
        let mut offset = 8 + slices.len() * 20;
        for (cpu, body) in slices {
            for v in [
                cpu.0 as u32,
                cpu.1 as u32,
                offset as u32,
                body.len() as u32,
                0,
            ] {
                out.extend_from_slice(&v.to_be_bytes());
            }
            offset += body.len();
        }
        for (_, body) in slices {
            out.extend_from_slice(body);
        }
        out
    }

    fn ar_header(name: &str, size: usize) -> Vec<u8> {
        let mut header = format!(
            "{:<16}{:<12}{:<6}{:<6}{:<8}{:<10}`\n",
            name, 0, 0, 0, 644, size
        )
        .into_bytes();
        header.truncate(ARCHIVE_HEADER_SIZE);
        header
    }

    /// Static archive: symbol table member, then one object with an extended name.
    pub fn archive(object: Vec<u8>) -> Vec<u8> {
        let symtab = vec![0u8; 8];
        let name = b"B.o\0\0\0\0\0";
        let mut out = ARCHIVE_MAGIC.to_vec();
        out.extend(ar_header("__.SYMDEF", symtab.len()));
        out.extend(&symtab);
        out.extend(ar_header(&format!("#1/{}", name.len()), name.len() + object.len()));
        out.extend_from_slice(name);
        out.extend(object);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use std::path::PathBuf;

    const UUID_A: [u8; 16] = [0xAA; 16];
    const UUID_B: [u8; 16] = [0xBB; 16];

    fn inspect(bytes: &[u8]) -> Result<Vec<Slice>, LoaderError> {
        parse_slices(bytes, Path::new("/tmp/B"))
    }

    #[test]
    fn thin_dynamic_binary() {
        let slices = inspect(&macho_64(ARM64, true, UUID_A)).unwrap();
        assert_eq!(
            slices,
            vec![(
                BinaryArchitecture::Arm64,
                BinaryLinking::Dynamic,
                Some(Uuid::from_bytes(UUID_A))
            )]
        );
    }

    #[test]
    fn fat_binary_lists_every_slice() {
        let bytes = fat(&[
            (ARM64, macho_64(ARM64, true, UUID_A)),
            (X86_64, macho_64(X86_64, true, UUID_B)),
        ]);
        let slices = inspect(&bytes).unwrap();
        let archs: Vec<_> = slices.iter().map(|s| s.0).collect();
        assert_eq!(archs, vec![BinaryArchitecture::Arm64, BinaryArchitecture::X8664]);
        assert_eq!(slices.iter().filter_map(|s| s.2).count(), 2);
    }

    #[test]
    fn fat_slice_without_header_falls_back_to_cpu_type() {
        let bytes = fat(&[(ARMV7, vec![0u8; 32])]);
        let slices = inspect(&bytes).unwrap();
        assert_eq!(
            slices,
            vec![(BinaryArchitecture::Armv7, BinaryLinking::Static, None)]
        );
    }

    #[test]
    fn static_archive_reads_first_object() {
        let bytes = archive(macho_64(ARM64, false, UUID_A));
        let slices = inspect(&bytes).unwrap();
        assert_eq!(slices[0].0, BinaryArchitecture::Arm64);
        assert_eq!(slices[0].1, BinaryLinking::Static);
    }

    #[test]
    fn garbage_is_metadata_not_found() {
        let err = inspect(b"not a binary at all").unwrap_err();
        assert!(matches!(err, LoaderError::MetadataNotFound(p) if p == PathBuf::from("/tmp/B")));
    }

    #[test]
    fn inspector_reads_through_file_handler() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("B");
        std::fs::write(&path, macho_64(ARM64, true, UUID_A)).unwrap();

        let inspector = MachOInspector::new(Arc::new(tuist_graph::FileHandler));
        assert_eq!(inspector.linking(&path).unwrap(), BinaryLinking::Dynamic);
        assert_eq!(inspector.uuids(&path).unwrap().len(), 1);
        assert!(matches!(
            inspector.architectures(&dir.path().join("missing")),
            Err(LoaderError::MetadataNotFound(_))
        ));
    }
}
