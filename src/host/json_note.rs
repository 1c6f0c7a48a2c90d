use std::{
    collections::hash_map::DefaultHasher,
    fs,
    hash::{
        Hash,
        Hasher,
    },
    path::{
        Path,
        PathBuf,
    },
};

use reqwest::blocking::Client;
use serde::{
    Deserialize,
    Serialize,
};

use super::{
    NoteHost,
    WriteTarget,
};
use crate::{
    core::{
        http::{
            download_to_file,
            http_client,
            DEFAULT_TIMEOUT,
        },
        SuggestError,
    },
    persistence,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteField {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NoteFile {
    pub note_type: String,
    pub fields: Vec<NoteField>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A note stored as a JSON file, with downloaded media kept in a `media/`
/// directory beside it. Writes are saved on [`NoteHost::refresh`].
pub struct JsonNoteHost {
    path: PathBuf,
    media_dir: PathBuf,
    note: NoteFile,
    client: Option<Client>,
    current: Option<WriteTarget>,
    notices: Vec<String>,
}

impl JsonNoteHost {
    pub fn load(path: &Path) -> Result<Self, SuggestError> {
        let content = fs::read_to_string(path).map_err(|e| {
            SuggestError::Custom(format!("Failed to read note {}: {}", path.display(), e))
        })?;
        let note: NoteFile = serde_json::from_str(&content)?;
        Ok(Self::new(path, note))
    }

    pub fn new(path: &Path, note: NoteFile) -> Self {
        let media_dir = path.parent().unwrap_or_else(|| Path::new(".")).join("media");
        Self {
            path: path.to_path_buf(),
            media_dir,
            note,
            client: None,
            current: None,
            notices: Vec::new(),
        }
    }

    pub fn note(&self) -> &NoteFile {
        &self.note
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// Selects the field to write into by name ("Tags" selects the tag list).
    pub fn focus(&mut self, field: &str) -> Result<(), SuggestError> {
        let target = WriteTarget::resolve(field, &self.field_names())
            .ok_or_else(|| SuggestError::FieldNotFound(field.to_string()))?;
        self.current = Some(target);
        Ok(())
    }

    fn client(&mut self) -> Result<&Client, SuggestError> {
        if self.client.is_none() {
            self.client = Some(http_client(DEFAULT_TIMEOUT)?);
        }
        self.client.as_ref().ok_or_else(|| SuggestError::Custom("HTTP client missing".to_string()))
    }
}

/// Stable local name for a remote URL, keeping the extension when the path has one.
fn media_file_name(url: &str) -> String {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);

    let path = url.split(['?', '#']).next().unwrap_or_default();
    let last = path.rsplit('/').next().unwrap_or_default();
    let ext = match last.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            ext.to_ascii_lowercase()
        }
        _ => "jpg".to_string(),
    };

    format!("suggestr-{:016x}.{}", hasher.finish(), ext)
}

impl NoteHost for JsonNoteHost {
    fn field_values(&self) -> Vec<String> {
        self.note.fields.iter().map(|f| f.value.clone()).collect()
    }

    fn field_names(&self) -> Vec<String> {
        self.note.fields.iter().map(|f| f.name.clone()).collect()
    }

    fn field_count(&self) -> usize {
        self.note.fields.len()
    }

    fn note_type_id(&self) -> String {
        self.note.note_type.clone()
    }

    fn set_field(&mut self, index: usize, value: &str) -> Result<(), SuggestError> {
        let field = self
            .note
            .fields
            .get_mut(index)
            .ok_or_else(|| SuggestError::FieldNotFound(format!("#{index}")))?;
        field.value = value.to_string();
        Ok(())
    }

    fn append_tags(&mut self, tags: &[String]) -> Result<(), SuggestError> {
        for tag in tags {
            if !self.note.tags.contains(tag) {
                self.note.tags.push(tag.clone());
            }
        }
        Ok(())
    }

    fn resolve_remote_url(&mut self, url: &str) -> Result<String, SuggestError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Ok(url.to_string());
        }

        let file_name = media_file_name(url);
        let target = self.media_dir.join(&file_name);
        // an empty file is a leftover, not a cached download
        let cached = fs::metadata(&target).map(|m| m.len() > 0).unwrap_or(false);
        if !cached {
            fs::create_dir_all(&self.media_dir)?;
            let client = self.client()?.clone();
            download_to_file(&client, url, &target)?;
        }
        Ok(file_name)
    }

    fn current_target(&self) -> Option<WriteTarget> {
        self.current
    }

    fn set_current_target(&mut self, target: Option<WriteTarget>) {
        self.current = target;
    }

    fn refresh(&mut self) -> Result<(), SuggestError> {
        persistence::write_json(&self.note, &self.path)
    }

    fn notify(&mut self, message: &str) {
        eprintln!("{message}");
        self.notices.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{
            Read,
            Write,
        },
        net::TcpListener,
        thread,
    };

    use super::*;

    fn sample_note() -> NoteFile {
        NoteFile {
            note_type: "Basic".to_string(),
            fields: vec![
                NoteField { name: "Front".to_string(), value: "hello".to_string() },
                NoteField { name: "Back".to_string(), value: String::new() },
            ],
            tags: vec!["french".to_string()],
        }
    }

    #[test]
    fn test_writes_are_saved_on_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.json");
        let mut host = JsonNoteHost::new(&path, sample_note());

        host.focus("Back").unwrap();
        assert_eq!(host.current_target(), Some(WriteTarget::Field(1)));
        host.set_field(1, "bonjour").unwrap();
        host.append_tags(&["greeting".to_string(), "french".to_string()]).unwrap();
        host.refresh().unwrap();

        let reloaded = JsonNoteHost::load(&path).unwrap();
        assert_eq!(reloaded.field_values(), vec!["hello", "bonjour"]);
        assert_eq!(reloaded.note().tags, vec!["french", "greeting"]);
        assert!(host.focus("Nope").is_err());
        assert!(host.set_field(7, "x").is_err());
    }

    #[test]
    fn test_local_references_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = JsonNoteHost::new(&dir.path().join("note.json"), sample_note());
        assert_eq!(host.resolve_remote_url("already-local.jpg").unwrap(), "already-local.jpg");
    }

    #[test]
    fn test_empty_cached_media_is_downloaded_again() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/cat.png", listener.local_addr().unwrap());
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\nConnection: close\r\n\r\npng");
        });

        let dir = tempfile::tempdir().unwrap();
        let mut host = JsonNoteHost::new(&dir.path().join("note.json"), sample_note());
        let media = dir.path().join("media");
        fs::create_dir_all(&media).unwrap();
        fs::write(media.join(media_file_name(&url)), b"").unwrap();

        let name = host.resolve_remote_url(&url).unwrap();
        assert_eq!(fs::read(media.join(&name)).unwrap(), b"png");
    }

    #[test]
    fn test_media_file_name() {
        let a = media_file_name("https://audio.test/x/word.MP3?key=1");
        assert!(a.starts_with("suggestr-") && a.ends_with(".mp3"), "{a}");
        let b = media_file_name("https://tse2.mm.bing.net/th?id=OIP.abc&pid=Api");
        assert!(b.ends_with(".jpg"), "{b}");
        assert_eq!(a, media_file_name("https://audio.test/x/word.MP3?key=1"));
    }
}
