//! Locates the Windows kernel image inside guest physical memory and
//! extracts the `CodeView` debug directory entry used to fetch a matching
//! `isr` profile.
//!
//! This is PE-format and Windows-ISR-ecosystem glue, not breakpoint-engine
//! logic, so it lives in the operator binary rather than in `vmi-tracer`.

use isr_dl_pdb::CodeView;
use object::{
    endian::LittleEndian as LE,
    pe::{
        ImageDataDirectory, ImageDebugDirectory, ImageDosHeader, ImageNtHeaders64,
        ImageOptionalHeader64, IMAGE_DEBUG_TYPE_CODEVIEW, IMAGE_DIRECTORY_ENTRY_DEBUG,
        IMAGE_DOS_SIGNATURE, IMAGE_NT_SIGNATURE,
    },
    pod::slice_from_all_bytes,
    read::{
        pe::{ImageNtHeaders as _, ImageOptionalHeader as _},
        ReadRef as _,
    },
};
use vmi_core::{AddressContext, Architecture as _, Va, VmiCore, VmiError, VmiFullDriver};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Base address and `CodeView` record of a located kernel image.
#[derive(Debug)]
pub struct KernelInfo {
    pub base_address: Va,
    pub codeview: CodeView,
}

const CV_SIGNATURE_RSDS: u32 = 0x5344_5352;

#[repr(C)]
#[derive(Debug, Copy, Clone, FromBytes, IntoBytes, Immutable, KnownLayout)]
struct CvInfoPdb70 {
    signature: u32,
    guid: [u8; 16],
    age: u32,
}

/// Scans backward from an aligned `MSR_LSTAR` for a `MZ`/PE64 image and
/// extracts its `CodeView` debug info, the way `MSR_LSTAR` reliably points
/// somewhere inside the kernel's mapped image.
pub fn find_kernel<Driver>(
    vmi: &VmiCore<Driver>,
    root: vmi_core::Pa,
    msr_lstar: u64,
) -> Result<Option<KernelInfo>, VmiError>
where
    Driver: VmiFullDriver,
{
    const MAX_BACKWARD_SEARCH: u64 = 32 * 1024 * 1024;

    let page_size = Driver::Architecture::PAGE_SIZE;
    let lstar = msr_lstar & Driver::Architecture::PAGE_MASK;

    let mut data = vec![0u8; page_size as usize];

    for base in (lstar - MAX_BACKWARD_SEARCH..=lstar).rev().step_by(page_size as usize) {
        let base_address = Va(base);

        match vmi.read(AddressContext::new(base_address, root), &mut data) {
            Ok(()) => {}
            Err(VmiError::Translation(_)) => continue,
            Err(err) => return Err(err),
        }

        if &data[..2] != b"MZ" {
            continue;
        }

        tracing::debug!(%base_address, "found MZ");

        match codeview_from_pe(vmi, AddressContext::new(base_address, root), &data)? {
            Some(codeview) => return Ok(Some(KernelInfo { base_address, codeview })),
            None => tracing::warn!(%base_address, "MZ header with no usable CodeView record"),
        }
    }

    Ok(None)
}

fn codeview_from_pe<Driver>(
    vmi: &VmiCore<Driver>,
    ctx: AddressContext,
    header_page: &[u8],
) -> Result<Option<CodeView>, VmiError>
where
    Driver: VmiFullDriver,
{
    let dos_header = match header_page.read_at::<ImageDosHeader>(0) {
        Ok(header) if header.e_magic.get(LE) == IMAGE_DOS_SIGNATURE => header,
        _ => return Ok(None),
    };

    let mut offset = dos_header.nt_headers_offset() as u64;
    let nt_headers = match header_page.read::<ImageNtHeaders64>(&mut offset) {
        Ok(nt_headers) if nt_headers.signature() == IMAGE_NT_SIGNATURE => nt_headers,
        _ => return Ok(None),
    };

    if !nt_headers.is_valid_optional_magic() {
        return Ok(None);
    }

    let optional_data_size = match u64::from(nt_headers.file_header().size_of_optional_header.get(LE))
        .checked_sub(size_of::<ImageOptionalHeader64>() as u64)
    {
        Some(size) => size,
        None => return Ok(None),
    };

    let optional_data = match header_page.read_bytes(&mut offset, optional_data_size) {
        Ok(data) => data,
        Err(_) => return Ok(None),
    };

    let data_directories: &[ImageDataDirectory] = match optional_data.read_slice_at(
        0,
        nt_headers.optional_header().number_of_rva_and_sizes() as usize,
    ) {
        Ok(dirs) => dirs,
        Err(_) => return Ok(None),
    };

    let data_dir: &ImageDataDirectory = match data_directories.get(IMAGE_DIRECTORY_ENTRY_DEBUG) {
        Some(data_dir) => data_dir,
        None => return Ok(None),
    };

    let rva = data_dir.virtual_address.get(LE);
    let size = data_dir.size.get(LE);

    if rva == 0 || size == 0 || size as u64 > Driver::Architecture::PAGE_SIZE {
        return Ok(None);
    }

    let debug_dir_va = ctx.va + rva as u64;
    let mut debug_data = vec![0u8; size as usize];
    vmi.read((debug_dir_va, ctx.root), &mut debug_data)?;

    let debug_dirs = match slice_from_all_bytes::<ImageDebugDirectory>(&debug_data) {
        Ok(debug_dirs) => debug_dirs,
        Err(_) => return Ok(None),
    };

    for debug_dir in debug_dirs {
        if debug_dir.typ.get(LE) != IMAGE_DEBUG_TYPE_CODEVIEW {
            continue;
        }

        if debug_dir.address_of_raw_data.get(LE) == 0
            || (debug_dir.size_of_data.get(LE) as usize) < size_of::<CvInfoPdb70>()
        {
            continue;
        }

        let info_va = ctx.va + debug_dir.address_of_raw_data.get(LE) as u64;
        let info_size = debug_dir.size_of_data.get(LE) as usize;

        let mut info_data = vec![0u8; info_size];
        vmi.read((info_va, ctx.root), &mut info_data)?;

        let (info, pdb_path) = info_data.split_at(size_of::<CvInfoPdb70>());

        let Ok(info) = CvInfoPdb70::ref_from_bytes(info)
        else {
            continue;
        };

        if info.signature != CV_SIGNATURE_RSDS {
            continue;
        }

        let path = String::from_utf8_lossy(pdb_path)
            .trim_end_matches('\0')
            .to_string();

        let guid0 = u32::from_le_bytes(info.guid[0..4].try_into().unwrap());
        let guid1 = u16::from_le_bytes(info.guid[4..6].try_into().unwrap());
        let guid2 = u16::from_le_bytes(info.guid[6..8].try_into().unwrap());
        let guid3 = &info.guid[8..16];

        let guid = format!(
            "{:08x}{:04x}{:04x}{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}{:01x}",
            guid0,
            guid1,
            guid2,
            guid3[0],
            guid3[1],
            guid3[2],
            guid3[3],
            guid3[4],
            guid3[5],
            guid3[6],
            guid3[7],
            info.age & 0xf,
        );

        return Ok(Some(CodeView { path, guid }));
    }

    Ok(None)
}
