#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use git2::{IndexAddOption, Repository, Signature};
use tempfile::{TempDir, tempdir};

pub const POOL: &str = "lock-pool";
pub const BRANCH: &str = "master";

/// A bare repository seeded with one pool, standing in for the shared remote.
pub struct SeededRemote {
    _root: TempDir,
    bare: PathBuf,
}

impl SeededRemote {
    pub fn new(unclaimed: &[&str], claimed: &[&str]) -> Self {
        Self::with_files(unclaimed, claimed, &[])
    }

    /// Like `new`, plus extra repository files such as a `.gitignore`.
    pub fn with_files(unclaimed: &[&str], claimed: &[&str], extra: &[(&str, &str)]) -> Self {
        let root = tempdir().unwrap();
        let bare = root.path().join("pool.git");
        Repository::init_bare(&bare).unwrap();

        let seed_dir = root.path().join("seed");
        let seed = Repository::init(&seed_dir).unwrap();
        for collection in ["unclaimed", "claimed"] {
            write(&seed_dir, &format!("{POOL}/{collection}/.gitkeep"), "");
        }
        write(&seed_dir, "README.md", "shared pool\n");
        for (path, contents) in extra {
            write(&seed_dir, path, contents);
        }
        for name in unclaimed {
            write(&seed_dir, &format!("{POOL}/unclaimed/{name}"), &payload(name));
        }
        for name in claimed {
            write(&seed_dir, &format!("{POOL}/claimed/{name}"), &payload(name));
        }

        let mut index = seed.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::FORCE, None)
            .unwrap();
        index.write().unwrap();
        let tree = seed.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Seed", "seed@example.com").unwrap();
        let branch_ref = format!("refs/heads/{BRANCH}");
        seed.commit(Some(&branch_ref), &sig, &sig, "seed pool", &tree, &[])
            .unwrap();

        let mut origin = seed.remote("origin", bare.to_str().unwrap()).unwrap();
        origin
            .push(&[format!("{branch_ref}:{branch_ref}").as_str()], None)
            .unwrap();

        Self { _root: root, bare }
    }

    pub fn uri(&self) -> String {
        self.bare.to_str().unwrap().to_string()
    }

    pub fn tip(&self) -> String {
        let repo = Repository::open_bare(&self.bare).unwrap();
        repo.refname_to_id(&format!("refs/heads/{BRANCH}"))
            .unwrap()
            .to_string()
    }

    /// Lock names in (unclaimed, claimed) at the tip of the branch.
    pub fn state(&self) -> (Vec<String>, Vec<String>) {
        (self.names("unclaimed"), self.names("claimed"))
    }

    pub fn read(&self, collection: &str, name: &str) -> Option<Vec<u8>> {
        let repo = Repository::open_bare(&self.bare).unwrap();
        let tree = repo
            .find_reference(&format!("refs/heads/{BRANCH}"))
            .unwrap()
            .peel_to_tree()
            .unwrap();
        let entry = tree
            .get_path(Path::new(&format!("{POOL}/{collection}/{name}")))
            .ok()?;
        let blob = entry.to_object(&repo).unwrap().peel_to_blob().unwrap();
        Some(blob.content().to_vec())
    }

    /// Commit count on the branch.
    pub fn history_len(&self) -> usize {
        let repo = Repository::open_bare(&self.bare).unwrap();
        let mut walk = repo.revwalk().unwrap();
        walk.push_ref(&format!("refs/heads/{BRANCH}")).unwrap();
        walk.count()
    }

    fn names(&self, collection: &str) -> Vec<String> {
        let repo = Repository::open_bare(&self.bare).unwrap();
        let tree = repo
            .find_reference(&format!("refs/heads/{BRANCH}"))
            .unwrap()
            .peel_to_tree()
            .unwrap();
        let Ok(entry) = tree.get_path(Path::new(&format!("{POOL}/{collection}"))) else {
            return Vec::new();
        };
        let dir = entry.to_object(&repo).unwrap().peel_to_tree().unwrap();
        dir.iter()
            .filter_map(|e| e.name().map(str::to_string))
            .filter(|name| !name.starts_with('.'))
            .collect()
    }
}

pub fn payload(name: &str) -> String {
    format!("payload-{name}")
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn write(root: &Path, path: &str, contents: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}
