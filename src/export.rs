//! Offline export of crawl results to sitemap.xml

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::storage::{Storage, StorageError};

/// Read `sitemap.jsonl` from the data directory and write a sitemap.xml with
/// one entry per successfully crawled page. Returns the number of URLs
/// written.
pub fn export_sitemap(data_dir: &Path, output: &Path) -> Result<usize, StorageError> {
    let results = Storage::load_results(data_dir)?;

    let mut writer = SitemapXmlWriter::create(output)?;
    for result in &results {
        if !result.error.is_empty() || !(200..300).contains(&result.status_code) {
            continue;
        }
        writer.add_url(&result.url, Some(&result.crawled_at.format("%Y-%m-%d").to_string()))?;
    }

    Ok(writer.finish()?)
}

/// Streaming sitemap.xml writer.
struct SitemapXmlWriter {
    writer: BufWriter<File>,
    url_count: usize,
}

impl SitemapXmlWriter {
    fn create(path: &Path) -> std::io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            writer,
            r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#
        )?;

        Ok(Self {
            writer,
            url_count: 0,
        })
    }

    fn add_url(&mut self, loc: &str, lastmod: Option<&str>) -> std::io::Result<()> {
        writeln!(self.writer, "  <url>")?;
        writeln!(self.writer, "    <loc>{}</loc>", escape_xml(loc))?;
        if let Some(lastmod) = lastmod {
            writeln!(self.writer, "    <lastmod>{}</lastmod>", escape_xml(lastmod))?;
        }
        writeln!(self.writer, "  </url>")?;
        self.url_count += 1;
        Ok(())
    }

    fn finish(mut self) -> std::io::Result<usize> {
        writeln!(self.writer, "</urlset>")?;
        self.writer.flush()?;
        Ok(self.url_count)
    }
}

fn escape_xml(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageResult, UrlItem};
    use tempfile::TempDir;

    fn record(url: &str, status: u16, error: &str) -> PageResult {
        let mut result = PageResult::started(&UrlItem::seed(url));
        result.status_code = status;
        result.error = error.to_string();
        result
    }

    #[test]
    fn exports_only_successful_records() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        storage.append_result(&record("http://t/good", 200, "")).unwrap();
        storage
            .append_result(&record("http://t/missing", 404, "non-200 status: 404"))
            .unwrap();
        storage
            .append_result(&record("http://t/blocked", 0, "blocked by robots.txt"))
            .unwrap();
        storage.close().unwrap();

        let output = dir.path().join("sitemap.xml");
        let count = export_sitemap(dir.path(), &output).unwrap();
        assert_eq!(count, 1);

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("<loc>http://t/good</loc>"));
        assert!(!content.contains("missing"));
        assert!(!content.contains("blocked"));
        assert!(content.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(content.trim_end().ends_with("</urlset>"));
    }

    #[test]
    fn escapes_special_characters_in_locs() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        storage
            .append_result(&record("http://t/page?a=1&b=2", 200, ""))
            .unwrap();
        storage.close().unwrap();

        let output = dir.path().join("sitemap.xml");
        export_sitemap(dir.path(), &output).unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("http://t/page?a=1&amp;b=2"));
    }

    #[test]
    fn empty_data_dir_exports_empty_urlset() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("sitemap.xml");
        let count = export_sitemap(dir.path(), &output).unwrap();
        assert_eq!(count, 0);
        assert!(std::fs::read_to_string(&output)
            .unwrap()
            .contains("<urlset"));
    }
}
