use crate::error::Result;
use crate::sections::Section;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]+").expect("NON_WORD_RE"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_RE"));

/// Make a course or lesson name safe to use as a path component.
pub fn sanitize_component(name: &str) -> String {
    let cleaned = NON_WORD_RE.replace_all(name, " ");
    WHITESPACE_RE.replace_all(cleaned.trim(), "_").to_string()
}

/// Write one lesson's sections as a CSV file under the course directory.
/// Returns the path of the written file.
pub fn write_lesson_csv(
    output_dir: &Path,
    course_slug: &str,
    module: &str,
    lesson_title: &str,
    sections: &[Section],
) -> Result<PathBuf> {
    let course_dir = output_dir.join(sanitize_component(course_slug));
    fs::create_dir_all(&course_dir)?;

    let path = course_dir.join(format!("{}.csv", sanitize_component(lesson_title)));

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(["module", "lesson_title", "section", "content"])?;
    for section in sections {
        writer.write_record([
            module,
            lesson_title,
            section.heading.as_str(),
            section.content.as_str(),
        ])?;
    }
    writer.flush()?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_removes_special_chars() {
        assert_eq!(sanitize_component("How/Why? It works!"), "How_Why_It_works");
    }

    #[test]
    fn sanitize_keeps_spaces_as_underscores() {
        assert_eq!(sanitize_component("Zero Shot Learning"), "Zero_Shot_Learning");
    }

    #[test]
    fn sanitize_keeps_hyphens_and_underscores() {
        assert_eq!(sanitize_component("intro-to-ml_v2"), "intro-to-ml_v2");
    }

    #[test]
    fn writes_header_and_one_row_per_section() {
        let dir = tempfile::tempdir().unwrap();
        let sections = vec![
            Section {
                heading: "Intro".to_string(),
                content: "Hello world".to_string(),
            },
            Section {
                heading: "Part A".to_string(),
                content: "More content".to_string(),
            },
        ];

        let path = write_lesson_csv(dir.path(), "test-course", "Week 1", "My Lesson", &sections)
            .unwrap();

        assert!(path.exists());
        assert_eq!(path.file_name().unwrap(), "My_Lesson.csv");

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(
            reader.headers().unwrap(),
            &csv::StringRecord::from(vec!["module", "lesson_title", "section", "content"])
        );

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(0), Some("Week 1"));
        assert_eq!(rows[0].get(1), Some("My Lesson"));
        assert_eq!(rows[0].get(2), Some("Intro"));
        assert_eq!(rows[0].get(3), Some("Hello world"));
        assert_eq!(rows[1].get(2), Some("Part A"));
    }

    #[test]
    fn rows_survive_embedded_commas_and_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let sections = vec![Section {
            heading: "S1".to_string(),
            content: "line one\nline two, with comma".to_string(),
        }];

        let path = write_lesson_csv(dir.path(), "slug", "Mod", "Lesson", &sections).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows[0].get(3), Some("line one\nline two, with comma"));
    }
}
