use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{
    core::utils::download_file_with_progress,
    error::ProvisionError,
    model::{Headers, Tag, VersionDescriptor, VersionManifest, VersionMeta},
};

type Progress = Box<dyn Fn(u64, u64, u64)>;

/// Everything that goes over the network
#[cfg_attr(test, mockall::automock)]
pub trait Remote {
    /// GET `url` and parse the body as JSON
    fn fetch_json(&self, url: &str) -> Result<Value, ProvisionError>;

    /// GET `url` and write the body to `dest`, replacing whatever was there
    ///
    /// Returns the number of bytes written
    fn download_file(&self, url: &str, dest: &Path, headers: &Headers)
        -> Result<u64, ProvisionError>;
}

/// Blocking [`Remote`] backed by a `ureq` agent
pub struct UreqRemote {
    agent: ureq::Agent,
    progress: Option<Progress>,
}

impl Default for UreqRemote {
    fn default() -> Self {
        Self {
            agent: ureq::Agent::new(),
            progress: None,
        }
    }
}

impl UreqRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report download progress as `(delta, current, total)`
    ///
    /// `total` is 0 when the server doesn't send a content length
    pub fn with_progress(mut self, cb: impl Fn(u64, u64, u64) + 'static) -> Self {
        self.progress = Some(Box::new(cb));
        self
    }
}

impl Remote for UreqRemote {
    fn fetch_json(&self, url: &str) -> Result<Value, ProvisionError> {
        debug!("Fetching {}", url);
        let raw = self
            .agent
            .get(url)
            .set("accept", "application/json")
            .call()?;
        Ok(serde_json::from_str(&raw.into_string()?)?)
    }

    fn download_file(
        &self,
        url: &str,
        dest: &Path,
        headers: &Headers,
    ) -> Result<u64, ProvisionError> {
        let mut req = self.agent.get(url);
        for (k, v) in headers {
            req = req.set(k, v);
        }
        let res = req.call()?;

        match &self.progress {
            Some(cb) => download_file_with_progress(res, dest, |d, c, t| cb(d, c, t)),
            None => download_file_with_progress(res, dest, |_, _, _| {}),
        }
    }
}

fn fetch<T: DeserializeOwned>(remote: &impl Remote, url: &str) -> Result<T, ProvisionError> {
    Ok(serde_json::from_value(remote.fetch_json(url)?)?)
}

pub fn get_version_manifest(
    remote: &impl Remote,
    url: &str,
) -> Result<VersionManifest, ProvisionError> {
    fetch(remote, url)
}

pub fn get_version_meta(remote: &impl Remote, url: &str) -> Result<VersionMeta, ProvisionError> {
    fetch(remote, url)
}

pub fn get_tags(remote: &impl Remote, url: &str) -> Result<Vec<Tag>, ProvisionError> {
    fetch(remote, url)
}

/// Find the manifest entry for the latest release
///
/// # Errors
/// * `ProvisionError::ManifestError` if the manifest names a latest release it doesn't list
pub fn latest_release(manifest: &VersionManifest) -> Result<VersionDescriptor, ProvisionError> {
    let latest = &manifest.latest.release;
    manifest
        .versions
        .iter()
        .find(|v| &v.id == latest)
        .map(|v| VersionDescriptor {
            id: v.id.clone(),
            url: v.url.clone(),
        })
        .ok_or_else(|| ProvisionError::ManifestError(latest.clone()))
}

/// Fetch the version manifest and resolve its latest release
pub fn resolve_latest_base_version(
    remote: &impl Remote,
    manifest_url: &str,
) -> Result<VersionDescriptor, ProvisionError> {
    let manifest = get_version_manifest(remote, manifest_url)?;
    debug!("Manifest lists {} versions", manifest.versions.len());
    latest_release(&manifest)
}

/// Fetch the loader's tag list and normalize the last (newest) entry
pub fn resolve_latest_loader_tag(
    remote: &impl Remote,
    tags_url: &str,
) -> Result<String, ProvisionError> {
    let tags = get_tags(remote, tags_url)?;
    let last = tags
        .last()
        .ok_or_else(|| ProvisionError::MissingTag(tags_url.into()))?;
    debug!("Newest tag is {}", last.name);
    Ok(normalize_tag(&last.name))
}

/// Strip one leading `v` and pad two segment tags to three
///
/// Tags aren't checked for being numeric, `v51.0` becomes `51.0.0` but so does `va.b` become `a.b.0`
pub fn normalize_tag(tag: &str) -> String {
    let mut tag = tag.strip_prefix('v').unwrap_or(tag).to_string();
    if tag.split('.').count() == 2 {
        tag.push_str(".0");
    }
    tag
}

/// Fill the `{mc}` and `{loader}` placeholders of an installer URL template
pub fn installer_url(template: &str, mc_version: &str, loader_version: &str) -> String {
    template
        .replace("{mc}", mc_version)
        .replace("{loader}", loader_version)
}

#[cfg(test)]
mod test {
    use std::{
        cell::RefCell,
        collections::HashMap,
        fs,
        io::{BufRead, BufReader, Write},
        net::TcpListener,
        rc::Rc,
        thread::{self, JoinHandle},
    };

    use serde_json::json;

    use crate::{
        error::ProvisionError,
        model::{Headers, Latest, Settings, VersionEntry, VersionManifest},
    };

    use super::{
        installer_url, latest_release, normalize_tag, resolve_latest_base_version,
        resolve_latest_loader_tag, MockRemote, Remote, UreqRemote,
    };

    /// Answer a single request with `response`, handing back the request head
    fn serve_once(response: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/file", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                head.push_str(&line);
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            head
        });
        (url, handle)
    }

    fn manifest(latest: &str, ids: &[&str]) -> VersionManifest {
        VersionManifest {
            latest: Latest {
                release: latest.into(),
                _extra: HashMap::new(),
            },
            versions: ids
                .iter()
                .map(|id| VersionEntry {
                    id: id.to_string(),
                    url: format!("http://meta/{id}.json"),
                    _extra: HashMap::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn normalize_two_segments() {
        for (input, expected) in [("51.0", "51.0.0"), ("1.2", "1.2.0"), ("0.10", "0.10.0")] {
            assert_eq!(normalize_tag(input), expected);
        }
    }

    #[test]
    fn normalize_three_segments_is_identity() {
        for tag in ["51.0.0", "1.20.4", "47.2.17"] {
            assert_eq!(normalize_tag(tag), tag);
        }
    }

    #[test]
    fn normalize_strips_one_v() {
        assert_eq!(normalize_tag("v51.0"), "51.0.0");
        assert_eq!(normalize_tag("v1.2.3"), "1.2.3");
        assert_eq!(normalize_tag("vv1.2.3"), "v1.2.3");
    }

    #[test]
    fn normalize_leaves_malformed_tags() {
        assert_eq!(normalize_tag("latest"), "latest");
        assert_eq!(normalize_tag("1.2.3.4"), "1.2.3.4");
        assert_eq!(normalize_tag("a.b"), "a.b.0");
    }

    #[test]
    fn latest_release_found() {
        let res = latest_release(&manifest("1.21", &["1.21", "1.20.6"])).unwrap();
        assert_eq!(res.id, "1.21");
        assert_eq!(res.url, "http://meta/1.21.json");
    }

    #[test]
    fn latest_release_missing() {
        let res = latest_release(&manifest("1.22", &["1.21", "1.20.6"]));
        assert!(matches!(res, Err(ProvisionError::ManifestError(id)) if id == "1.22"));
    }

    #[test]
    fn resolve_base_version_from_remote() {
        let mut remote = MockRemote::new();
        remote
            .expect_fetch_json()
            .withf(|url| url == "http://manifest")
            .times(1)
            .returning(|_| {
                Ok(json!({
                    "latest": { "release": "1.21", "snapshot": "24w40a" },
                    "versions": [
                        { "id": "24w40a", "url": "http://meta/24w40a.json", "type": "snapshot" },
                        { "id": "1.21", "url": "http://meta/1.21.json", "type": "release" }
                    ]
                }))
            });

        let res = resolve_latest_base_version(&remote, "http://manifest").unwrap();
        assert_eq!(res.id, "1.21");
        assert_eq!(res.url, "http://meta/1.21.json");
    }

    #[test]
    fn resolve_base_version_bad_body() {
        let mut remote = MockRemote::new();
        remote
            .expect_fetch_json()
            .returning(|_| Ok(json!({ "versions": [] })));

        let res = resolve_latest_base_version(&remote, "http://manifest");
        assert!(matches!(res, Err(ProvisionError::JsonError(_))));
    }

    #[test]
    fn resolve_loader_tag_takes_last() {
        let mut remote = MockRemote::new();
        remote.expect_fetch_json().returning(|_| {
            Ok(json!([
                { "name": "v50.1" },
                { "name": "v51.0", "commit": { "sha": "abc" } }
            ]))
        });

        assert_eq!(resolve_latest_loader_tag(&remote, "http://tags").unwrap(), "51.0.0");
    }

    #[test]
    fn resolve_loader_tag_empty() {
        let mut remote = MockRemote::new();
        remote.expect_fetch_json().returning(|_| Ok(json!([])));

        let res = resolve_latest_loader_tag(&remote, "http://tags");
        assert!(matches!(res, Err(ProvisionError::MissingTag(_))));
    }

    #[test]
    fn build_installer_url() {
        let settings = Settings::new(".");
        assert_eq!(
            installer_url(&settings.installer_url_template, "1.21", "51.0.0"),
            "https://maven.minecraftforge.net/net/minecraftforge/forge/1.21-51.0.0/forge-1.21-51.0.0-installer.jar"
        );
    }

    #[test]
    fn download_sends_headers_and_overwrites() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 3\r\nConnection: close\r\n\r\nnew",
        );
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("server-installer.jar");
        fs::write(&dest, "OLD CONTENT THAT IS LONGER").unwrap();

        let headers = Headers::from([("User-Agent".to_string(), "Mozilla/5.0".to_string())]);
        let written = UreqRemote::new().download_file(&url, &dest, &headers).unwrap();

        assert_eq!(written, 3);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
        let head = server.join().unwrap();
        assert!(head.starts_with("GET /file "));
        assert!(head.contains("User-Agent: Mozilla/5.0\r\n"));
    }

    #[test]
    fn download_reports_progress() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        );
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("server.jar");

        let seen = Rc::new(RefCell::new(vec![]));
        let log = seen.clone();
        let remote =
            UreqRemote::new().with_progress(move |d, c, t| log.borrow_mut().push((d, c, t)));
        remote.download_file(&url, &dest, &Headers::new()).unwrap();
        server.join().unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.last().map(|c| c.1), Some(5));
        assert_eq!(seen.iter().map(|c| c.0).sum::<u64>(), 5);
        assert!(seen.iter().all(|c| c.2 == 5));
    }

    #[test]
    fn not_found_is_an_error() {
        let (url, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );

        let res = UreqRemote::new().fetch_json(&url);
        server.join().unwrap();
        assert!(matches!(res, Err(ProvisionError::DownloadError(_))));
    }

    #[test]
    fn truncated_json_is_an_error() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 21\r\nConnection: close\r\n\r\n{\"latest\":{\"release\":",
        );

        let res = UreqRemote::new().fetch_json(&url);
        server.join().unwrap();
        assert!(matches!(res, Err(ProvisionError::JsonError(_))));
    }
}
