//! Test utilities
//!
//! Proptest generators and in-memory archive fixtures.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a valid package name (lowercase alphanumeric with hyphens)
    pub fn package_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,30}[a-z0-9]?".prop_filter("Name must not be empty", |s| !s.is_empty())
    }

    /// Generate a tarball URL
    pub fn url() -> impl Strategy<Value = String> {
        (
            prop_oneof!["https", "http"],
            "[a-z]{3,10}",
            "[a-z]{2,5}",
            "[a-z0-9-]{1,20}",
        )
            .prop_map(|(scheme, domain, tld, path)| {
                format!("{scheme}://{domain}.{tld}/{path}.tar.gz")
            })
    }

    /// Generate an archive wrapper folder name like `zlib-1.2.11`
    pub fn wrapper_name() -> impl Strategy<Value = String> {
        ("[a-zA-Z][a-zA-Z0-9_]{0,15}", 0u32..20, 0u32..20)
            .prop_map(|(name, major, minor)| format!("{name}-{major}.{minor}"))
    }
}

#[cfg(test)]
pub mod fixtures {
    use flate2::write::GzEncoder;
    use std::io::{Cursor, Write};
    use tar::{Builder, EntryType, Header};

    fn tar_into<W: Write>(writer: W, wrapper: &str, files: &[(&str, &str)]) -> W {
        let mut builder = Builder::new(writer);

        let mut dir = Header::new_gnu();
        dir.set_entry_type(EntryType::Directory);
        dir.set_size(0);
        dir.set_mode(0o755);
        builder
            .append_data(&mut dir, format!("{wrapper}/"), std::io::empty())
            .unwrap();

        for (name, content) in files {
            let mut header = Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            builder
                .append_data(&mut header, format!("{wrapper}/{name}"), content.as_bytes())
                .unwrap();
        }

        builder.into_inner().unwrap()
    }

    /// A `.tar.gz` whose entries live under `wrapper/`
    pub fn tar_gz(wrapper: &str, files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        tar_into(encoder, wrapper, files).finish().unwrap()
    }

    /// A `.tar.bz2` whose entries live under `wrapper/`
    pub fn tar_bz2(wrapper: &str, files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        tar_into(encoder, wrapper, files).finish().unwrap()
    }

    /// A `.zip` whose entries live under `wrapper/`
    pub fn zip(wrapper: &str, files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();

        writer.add_directory(format!("{wrapper}/"), options).unwrap();
        for (name, content) in files {
            writer
                .start_file(format!("{wrapper}/{name}"), options)
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }

        writer.finish().unwrap().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_package_name_generator(name in package_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'));
        }

        #[test]
        fn test_url_generator(url in url()) {
            prop_assert!(url.ends_with(".tar.gz"));
        }
    }
}
