use std::io::{BufRead, Write};

use anyhow::{bail, Context};
use clap::Parser;
use colored::Colorize;
use crepo_sdk::{
    ClientConfig, CollectionMetadata, ContentRepoClient, ContentRepoService, ContentSource,
    ListQuery, ObjectMetadata, RepoCollectionInput, RepoObjectInput, RepoVersion, Status,
};
use crepo_store::{BucketInfo, DEFAULT_FILE_CONTENT_TYPE};
use serde::Serialize;

use crate::cli::{LsArgs, OutputFormat, PutArgs, ShellCommand, ShellLine};

/// A shell bound to one bucket at a time.
pub struct Session {
    client: ContentRepoClient,
    format: OutputFormat,
}

impl Session {
    pub fn new(config: &ClientConfig, format: OutputFormat) -> anyhow::Result<Self> {
        let client = ContentRepoClient::in_memory(config)?;
        Ok(Self { client, format })
    }

    /// Run every line of `input`. Script mode stops at the first failing
    /// line; interactive mode reports the failure and keeps going.
    pub fn run(
        &mut self,
        input: impl BufRead,
        out: &mut impl Write,
        interactive: bool,
    ) -> anyhow::Result<()> {
        if interactive {
            prompt(out, self.client.bucket())?;
        }
        for (index, line) in input.lines().enumerate() {
            let line = line.context("cannot read shell input")?;
            let trimmed = line.trim();
            if matches!(trimmed, "exit" | "quit") {
                break;
            }
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                let result = self.execute_line(trimmed, out);
                match result {
                    Ok(()) => {}
                    Err(e) if interactive => writeln!(out, "{} {e:#}", "error:".red().bold())?,
                    Err(e) => return Err(e.context(format!("line {}: {trimmed}", index + 1))),
                }
            }
            if interactive {
                prompt(out, self.client.bucket())?;
            }
        }
        Ok(())
    }

    pub fn execute_line(&mut self, line: &str, out: &mut impl Write) -> anyhow::Result<()> {
        let words = split_line(line)?;
        let parsed = ShellLine::try_parse_from(words)?;
        self.execute(parsed.command, out)
    }

    fn execute(&mut self, command: ShellCommand, out: &mut impl Write) -> anyhow::Result<()> {
        match command {
            ShellCommand::Bucket { name: None, .. } => {
                let buckets = self.client.service().buckets()?;
                self.emit(out, &buckets, |out, b| bucket_line(out, b, self.client.bucket()))
            }
            ShellCommand::Bucket { name: Some(name), create } => {
                if create {
                    self.client.service().create_bucket(&name)?;
                }
                self.client = self.client.with_bucket(&name)?;
                writeln!(out, "Using bucket {}", name.bold())?;
                Ok(())
            }
            ShellCommand::Put(args) => {
                let input = self.object_input(args)?;
                let meta = self.client.auto_create_object(input)?;
                self.emit_object(out, &meta)
            }
            ShellCommand::Version(args) => {
                let input = self.object_input(args)?;
                let meta = self.client.version_object(input)?;
                self.emit_object(out, &meta)
            }
            ShellCommand::Get { key, number, tag } => {
                let meta = match (number, tag) {
                    (Some(n), _) => self.client.get(&key, n)?,
                    (None, Some(tag)) => self.client.get_by_tag(&key, &tag)?,
                    (None, None) => self.client.latest(&key)?,
                };
                self.emit_object(out, &meta)
            }
            ShellCommand::Cat { key, number } => {
                let bytes = match number {
                    Some(n) => self.client.read(&key, n)?,
                    None => self.client.read_latest(&key)?,
                };
                out.write_all(&bytes)?;
                writeln!(out)?;
                Ok(())
            }
            ShellCommand::Latest { key } => {
                let meta = self.client.latest(&key)?;
                self.emit_object(out, &meta)
            }
            ShellCommand::Versions { key } => {
                let versions = self.client.versions(&key)?;
                self.emit(out, &versions, object_line)
            }
            ShellCommand::Delete { key, number, collection } => {
                let deleted = match (collection, number) {
                    (true, Some(n)) => self.client.delete_collection(&key, n)?,
                    (true, None) => bail!("collection delete needs an ordinal"),
                    (false, Some(n)) => self.client.delete(&key, n)?,
                    (false, None) => self.client.delete_latest(&key)?,
                };
                if deleted {
                    writeln!(out, "{} Deleted {}", "✓".green(), key.yellow())?;
                } else {
                    writeln!(out, "Nothing to delete for {}", key.yellow())?;
                }
                Ok(())
            }
            ShellCommand::Ls(args) => self.list(out, args),
            ShellCommand::Collect { key, members, tag } => {
                let members = members
                    .iter()
                    .map(|spec| self.resolve_member(spec))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                let mut input = RepoCollectionInput::new(self.client.id(&key)?, members);
                if let Some(tag) = tag {
                    input = input.with_tag(tag);
                }
                let meta = self.client.auto_create_collection(input)?;
                self.emit_collection(out, &meta)
            }
            ShellCommand::Collection { key, number } => {
                let meta = match number {
                    Some(n) => self.client.collection(&key, n)?,
                    None => self.client.latest_collection(&key)?,
                };
                self.emit_collection(out, &meta)
            }
            ShellCommand::Status => {
                let service = self.client.service();
                let config = service.repo_config()?;
                let status = service.repo_status()?;
                match self.format {
                    OutputFormat::Json => {
                        let value = serde_json::json!({ "config": config, "status": status });
                        writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
                    }
                    OutputFormat::Text => {
                        writeln!(out, "Engine: {}", config.version.cyan())?;
                        writeln!(out, "X-Reproxy: {}", config.has_x_reproxy)?;
                        writeln!(out, "Buckets: {}", status.bucket_count.to_string().bold())?;
                        writeln!(out, "Current: {}", self.client.bucket().yellow())?;
                    }
                }
                Ok(())
            }
        }
    }

    fn object_input(&self, args: PutArgs) -> anyhow::Result<RepoObjectInput> {
        let source = if args.file {
            ContentSource::from_file(&args.content)
        } else {
            ContentSource::from_bytes(args.content.into_bytes())
        };
        let mut input = self.client.object(&args.key, source)?;
        match args.content_type {
            Some(content_type) => input = input.with_content_type(content_type),
            None if !args.file => input = input.with_content_type("text/plain"),
            None => {}
        }
        if let Some(tag) = args.tag {
            input = input.with_tag(tag);
        }
        if let Some(meta) = args.meta {
            input = input.with_user_metadata(meta);
        }
        if let Some(name) = args.name {
            input = input.with_download_name(name);
        }
        Ok(input)
    }

    /// `KEY#N` names an exact ordinal; a bare `KEY` means its latest version.
    /// `KEY#N` pins ordinal N when everything after the last `#` is digits;
    /// any other spec names a key whose latest version is taken.
    fn resolve_member(&self, spec: &str) -> anyhow::Result<RepoVersion> {
        let pinned = spec.rsplit_once('#').filter(|(key, n)| {
            !key.is_empty() && !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())
        });
        let meta = match pinned {
            Some((key, number)) => {
                let number: u32 = number
                    .parse()
                    .with_context(|| format!("bad ordinal in member {spec}"))?;
                self.client.get(key, number)?
            }
            None => self.client.latest(spec)?,
        };
        Ok(meta.version.repo_version())
    }

    fn list(&self, out: &mut impl Write, args: LsArgs) -> anyhow::Result<()> {
        let mut query = ListQuery::from_signed(args.offset, args.limit)?.include_deleted(args.all);
        if let Some(tag) = args.tag {
            query = query.with_tag(tag);
        }
        if args.collections {
            let page = self.client.list_collections(&query)?;
            self.emit(out, &page, collection_line)
        } else {
            let page = self.client.list(&query)?;
            self.emit(out, &page, object_line)
        }
    }

    fn emit_object(&self, out: &mut impl Write, meta: &ObjectMetadata) -> anyhow::Result<()> {
        self.emit(out, std::slice::from_ref(meta), object_line)
    }

    fn emit_collection(
        &self,
        out: &mut impl Write,
        meta: &CollectionMetadata,
    ) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => write_json(out, meta),
            OutputFormat::Text => {
                collection_line(&mut *out, meta)?;
                for member in &meta.objects {
                    write!(out, "    ")?;
                    object_line(&mut *out, member)?;
                }
                Ok(())
            }
        }
    }

    fn emit<T: Serialize>(
        &self,
        out: &mut impl Write,
        items: &[T],
        mut line: impl FnMut(&mut dyn Write, &T) -> std::io::Result<()>,
    ) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => write_json(out, items),
            OutputFormat::Text => {
                if items.is_empty() {
                    writeln!(out, "{}", "(none)".dimmed())?;
                }
                for item in items {
                    line(&mut *out, item)?;
                }
                Ok(())
            }
        }
    }
}

fn prompt(out: &mut impl Write, bucket: &str) -> std::io::Result<()> {
    write!(out, "{}> ", bucket.cyan())?;
    out.flush()
}

fn write_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> anyhow::Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn status_label(status: Status) -> colored::ColoredString {
    match status {
        Status::Used => status.as_str().green(),
        Status::Deleted => status.as_str().red(),
    }
}

fn object_line(out: &mut dyn Write, meta: &ObjectMetadata) -> std::io::Result<()> {
    let v = &meta.version;
    write!(
        out,
        "{}/{}#{}  {}  {}  {} bytes  {}",
        v.bucket_name,
        v.key.bold(),
        v.version_number,
        v.version_id.short_hex().dimmed(),
        status_label(v.status),
        meta.size,
        if meta.content_type == DEFAULT_FILE_CONTENT_TYPE {
            meta.content_type.dimmed()
        } else {
            meta.content_type.normal()
        },
    )?;
    if let Some(tag) = &v.tag {
        write!(out, "  [{}]", tag.yellow())?;
    }
    writeln!(out)
}

fn collection_line(out: &mut dyn Write, meta: &CollectionMetadata) -> std::io::Result<()> {
    let v = &meta.version;
    write!(
        out,
        "{}/{}#{}  {}  {}  {} members",
        v.bucket_name,
        v.key.bold(),
        v.version_number,
        v.version_id.short_hex().dimmed(),
        status_label(v.status),
        meta.objects.len(),
    )?;
    if let Some(tag) = &v.tag {
        write!(out, "  [{}]", tag.yellow())?;
    }
    writeln!(out)
}

fn bucket_line(out: &mut dyn Write, info: &BucketInfo, current: &str) -> std::io::Result<()> {
    let marker = if info.bucket_name == current { "*" } else { " " };
    writeln!(
        out,
        "{} {}  {} objects  {} collections",
        marker.green().bold(),
        info.bucket_name.bold(),
        info.total_objects,
        info.total_collections,
    )
}

/// Split a shell line on whitespace; double quotes group words.
pub fn split_line(line: &str) -> anyhow::Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quoted {
        bail!("unterminated quote");
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
