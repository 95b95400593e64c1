/// 魔术字节检查结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicCheck {
    /// 内容与扩展名一致
    Match,
    /// 已知二进制格式但内容不符
    Mismatch,
    /// 文本或未登记的格式，不做判断
    Unknown,
}

/// 根据文件内容的前几个字节检查是否与扩展名匹配
///
/// `extension` 为小写、不含点的扩展名。
pub fn sniff_magic_bytes(data: &[u8], extension: &str) -> MagicCheck {
    let matched = match extension {
        // 图片格式
        "png" => data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
        "jpg" | "jpeg" => data.starts_with(&[0xFF, 0xD8, 0xFF]),
        "gif" => data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a"),
        "webp" => data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP",
        "bmp" => data.starts_with(b"BM"),

        // 文档格式
        "pdf" => data.starts_with(b"%PDF"),
        // MS Office 旧格式 (OLE Compound Document)
        "doc" | "xls" | "ppt" => {
            data.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])
        }
        // MS Office 新格式与 zip (ZIP-based)
        "docx" | "xlsx" | "pptx" | "zip" => data.starts_with(&[0x50, 0x4B, 0x03, 0x04]),

        // 压缩格式
        "rar" => data.starts_with(b"Rar!"),
        "7z" => data.starts_with(&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C]),
        "gz" => data.starts_with(&[0x1F, 0x8B]),

        _ => return MagicCheck::Unknown,
    };

    if matched {
        MagicCheck::Match
    } else {
        MagicCheck::Mismatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_magic() {
        let png_header = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(sniff_magic_bytes(&png_header, "png"), MagicCheck::Match);
        assert_eq!(sniff_magic_bytes(&png_header, "jpg"), MagicCheck::Mismatch);
    }

    #[test]
    fn test_pdf_magic() {
        let pdf_header = b"%PDF-1.4";
        assert_eq!(sniff_magic_bytes(pdf_header, "pdf"), MagicCheck::Match);
        assert_eq!(sniff_magic_bytes(pdf_header, "doc"), MagicCheck::Mismatch);
        assert_eq!(sniff_magic_bytes(b"MZ\x90\x00", "pdf"), MagicCheck::Mismatch);
    }

    #[test]
    fn test_docx_is_zip() {
        let zip_header = [0x50, 0x4B, 0x03, 0x04, 0x14, 0x00];
        assert_eq!(sniff_magic_bytes(&zip_header, "docx"), MagicCheck::Match);
        assert_eq!(sniff_magic_bytes(&zip_header, "zip"), MagicCheck::Match);
    }

    #[test]
    fn test_text_and_unknown_formats() {
        assert_eq!(sniff_magic_bytes(b"Hello, World!", "txt"), MagicCheck::Unknown);
        assert_eq!(sniff_magic_bytes(b"# notes", "md"), MagicCheck::Unknown);
        assert_eq!(sniff_magic_bytes(&[0x00, 0x01], "exe"), MagicCheck::Unknown);
    }

    #[test]
    fn test_empty_data_is_mismatch_for_known_types() {
        assert_eq!(sniff_magic_bytes(&[], "png"), MagicCheck::Mismatch);
    }
}
