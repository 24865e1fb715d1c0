use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::corpus::{self, CorpusIndex, SOURCE_KIND};
use crate::dates::{DATE_FORMAT, ResolvedDate};
use crate::extract::RawPost;
use crate::formats::CanonicalFrontMatter;

pub const TITLE_MAX_CHARS: usize = 80;
const ELLIPSIS: &str = "...";
const SOURCE_TAG: &str = "LinkedIn";
const IMAGE_ALT: &str = "LinkedIn Post Image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Created { slug: String },
    /// A document for this id already exists (possibly under another date).
    Skipped { slug: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectOutcome {
    Renamed { from: Vec<String>, to: String },
    Unchanged { slug: String },
    Missing,
}

/// First clause of the first non-empty line, capped at 80 characters.
pub fn title_from_text(text: &str) -> String {
    let first_line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    let clause = first_line
        .split(['.', '!', '?'])
        .next()
        .unwrap_or_default()
        .trim();
    let title = if clause.is_empty() { first_line } else { clause };

    if title.chars().count() > TITLE_MAX_CHARS {
        let keep = TITLE_MAX_CHARS - ELLIPSIS.chars().count();
        let mut truncated: String = title.chars().take(keep).collect();
        truncated.push_str(ELLIPSIS);
        truncated
    } else {
        title.to_owned()
    }
}

/// Double-quoted YAML scalar.
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

pub fn front_matter_for(post: &RawPost, date: &ResolvedDate) -> CanonicalFrontMatter {
    let mut title = title_from_text(&post.text);
    if title.is_empty() {
        title = format!("{SOURCE_TAG} post {}", post.id);
    }
    CanonicalFrontMatter {
        title,
        date: date.at.format(DATE_FORMAT).to_string(),
        tags: vec![SOURCE_TAG.to_owned()],
        permalink: post.source_url.clone(),
        source: SOURCE_KIND.to_owned(),
        date_confidence: Some(date.confidence),
        extra: serde_yaml::Mapping::new(),
    }
}

/// Known keys are laid out by hand (quoted title, flow-style tags) to match
/// the documents already on the site; hand-added keys follow as plain YAML.
pub fn render_front_matter(front: &CanonicalFrontMatter) -> anyhow::Result<String> {
    let tags = front
        .tags
        .iter()
        .map(|tag| quoted(tag))
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = String::new();
    out.push_str(&format!("title: {}\n", quoted(&front.title.replace('"', "'"))));
    out.push_str(&format!("date: {}\n", front.date));
    out.push_str(&format!("tags: [{tags}]\n"));
    out.push_str(&format!("linkedinUrl: {}\n", quoted(&front.permalink)));
    out.push_str(&format!("source: {}\n", quoted(&front.source)));
    if let Some(confidence) = front.date_confidence {
        out.push_str(&format!("dateConfidence: {confidence}\n"));
    }
    if !front.extra.is_empty() {
        let extra = serde_yaml::to_string(&front.extra).context("serialize extra front matter")?;
        out.push_str(&extra);
    }
    Ok(out)
}

/// Text, embedded media, then the attribution footer.
pub fn render_body(post: &RawPost) -> String {
    let mut lines = vec![String::new(), post.text.clone(), String::new()];
    if !post.media.is_empty() {
        lines.push(String::new());
        for reference in &post.media {
            lines.push(format!("![{IMAGE_ALT}]({reference})"));
        }
        lines.push(String::new());
    }
    lines.extend([
        String::new(),
        "---".to_owned(),
        String::new(),
        format!("*Originally posted on [{SOURCE_TAG}]({})*", post.source_url),
    ]);
    let mut body = lines.join("\n");
    body.push('\n');
    body
}

/// `rest` is everything after the closing delimiter line, kept verbatim.
pub fn assemble(front: &CanonicalFrontMatter, rest: &str) -> anyhow::Result<String> {
    Ok(format!("---\n{}---\n{rest}", render_front_matter(front)?))
}

/// Splits a document into its parsed metadata and the verbatim remainder.
pub fn parse_document(contents: &str) -> anyhow::Result<(CanonicalFrontMatter, &str)> {
    let after_open = contents
        .strip_prefix("---\n")
        .ok_or_else(|| anyhow::anyhow!("document must start with front matter ('---')"))?;
    let (yaml, rest) = if let Some(rest) = after_open.strip_prefix("---\n") {
        ("", rest)
    } else {
        let close = after_open
            .find("\n---\n")
            .ok_or_else(|| anyhow::anyhow!("front matter is not terminated"))?;
        (&after_open[..close], &after_open[close + "\n---\n".len()..])
    };
    let front: CanonicalFrontMatter =
        serde_yaml::from_str(yaml).context("deserialize front matter")?;
    Ok((front, rest))
}

/// Create-or-skip writer over one content directory. Calls must be
/// serialized: the duplicate check reads the in-memory index.
#[derive(Debug)]
pub struct CanonicalWriter {
    index: CorpusIndex,
}

impl CanonicalWriter {
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create content dir: {}", dir.display()))?;
        let index = CorpusIndex::scan(dir).context("index content dir")?;
        Ok(Self { index })
    }

    pub fn index(&self) -> &CorpusIndex {
        &self.index
    }

    pub fn write(&mut self, post: &RawPost, date: &ResolvedDate) -> anyhow::Result<WriteOutcome> {
        let id = post.id.as_str();
        let slug = corpus::slug_for(date.at, id);

        if let Some(existing) = self.index.slugs_for(id).into_iter().next() {
            return Ok(WriteOutcome::Skipped { slug: existing });
        }
        let path = self.index.path_for(&slug);
        if path.exists() {
            return Ok(WriteOutcome::Skipped { slug });
        }

        let contents = assemble(&front_matter_for(post, date), &render_body(post))?;
        let created = write_atomic(self.index.dir(), &path, &contents, false)
            .with_context(|| format!("write document: {}", path.display()))?;
        if !created {
            self.index.insert(id, &slug);
            return Ok(WriteOutcome::Skipped { slug });
        }

        self.index.insert(id, &slug);
        Ok(WriteOutcome::Created { slug })
    }

    /// Re-dates the document for `id` and moves it under the corrected slug.
    ///
    /// The corrected file is committed before any stale-dated file for the id
    /// is removed; afterwards exactly one document exists for the id.
    pub fn correct(&mut self, id: &str, date: &ResolvedDate) -> anyhow::Result<CorrectOutcome> {
        let existing = self.index.slugs_for(id);
        let Some(source_slug) = existing.first() else {
            return Ok(CorrectOutcome::Missing);
        };

        let source_path = self.index.path_for(source_slug);
        let contents = std::fs::read_to_string(&source_path)
            .with_context(|| format!("read document: {}", source_path.display()))?;
        let (mut front, rest) = parse_document(&contents)
            .with_context(|| format!("parse document: {}", source_path.display()))?;

        let new_slug = corpus::slug_for(date.at, id);
        let new_date = date.at.format(DATE_FORMAT).to_string();
        if existing.len() == 1
            && existing[0] == new_slug
            && front.date == new_date
            && front.date_confidence == Some(date.confidence)
        {
            return Ok(CorrectOutcome::Unchanged { slug: new_slug });
        }

        front.date = new_date;
        front.date_confidence = Some(date.confidence);
        let new_path = self.index.path_for(&new_slug);
        write_atomic(self.index.dir(), &new_path, &assemble(&front, rest)?, true)
            .with_context(|| format!("write corrected document: {}", new_path.display()))?;

        for stale in existing.iter().filter(|slug| **slug != new_slug) {
            let stale_path = self.index.path_for(stale);
            match std::fs::remove_file(&stale_path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(err).with_context(|| {
                        format!("remove stale document: {}", stale_path.display())
                    });
                }
            }
        }

        self.index.replace(id, &new_slug);
        Ok(CorrectOutcome::Renamed {
            from: existing,
            to: new_slug,
        })
    }
}

/// Writes through a temp file in `dir` and renames it into place, so a
/// partial document is never visible under its final name.
///
/// Returns `false` when `overwrite` is off and `path` appeared meanwhile.
fn write_atomic(dir: &Path, path: &Path, contents: &str, overwrite: bool) -> anyhow::Result<bool> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    tmp.write_all(contents.as_bytes())
        .context("write temp file")?;
    tmp.as_file().sync_all().context("sync temp file")?;

    if overwrite {
        tmp.persist(path).map_err(|err| err.error).context("rename temp file")?;
        return Ok(true);
    }

    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(err.error).context("rename temp file"),
    }
}
