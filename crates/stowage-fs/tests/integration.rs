use std::path::{Path, PathBuf};

use stowage_fs::tree::list_all;
use stowage_fs::{
    CancelToken, CopyOptions, CopyProgressEvent, Error, LinkCreator, OsFileSystem, Result,
    copy_file, force_delete, link, mass_link, mirror, normalize,
};
use tempfile::tempdir;

fn relative_paths(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<_> = list_all(&OsFileSystem, root, &[])
        .unwrap()
        .into_iter()
        .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
        .collect();
    paths.sort();
    paths
}

fn populate(root: &Path) {
    std::fs::create_dir_all(root.join("org/example/1.0/jars")).unwrap();
    std::fs::create_dir_all(root.join("org/example/1.0/empty")).unwrap();
    std::fs::write(root.join("org/example/1.0/ivy.xml"), "<ivy-module version=\"2.0\"/>").unwrap();
    std::fs::write(root.join("org/example/1.0/jars/example.jar"), vec![0xCA; 200_000]).unwrap();
}

#[test]
fn test_mirror_matches_source_layout() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("published");
    let dest = dir.path().join("retrieved");
    populate(&src);

    std::fs::create_dir_all(dest.join("org/stale/2.0")).unwrap();
    std::fs::write(dest.join("org/stale/2.0/old.jar"), "old").unwrap();
    std::fs::create_dir_all(dest.join("org/example")).unwrap();
    std::fs::write(dest.join("org/example/1.0"), "file where a dir belongs").unwrap();

    mirror(&OsFileSystem, &src, &dest, CopyOptions::new()).unwrap();

    assert_eq!(relative_paths(&src), relative_paths(&dest));
    assert_eq!(
        std::fs::read(dest.join("org/example/1.0/jars/example.jar")).unwrap().len(),
        200_000
    );
}

#[cfg(unix)]
#[test]
fn test_mirror_over_linked_tree_keeps_sources() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("published");
    let dest = dir.path().join("retrieved");
    populate(&src);

    let jar = Path::new("org/example/1.0/jars/example.jar");
    std::fs::create_dir_all(dest.join(jar).parent().unwrap()).unwrap();
    std::os::unix::fs::symlink(src.join(jar), dest.join(jar)).unwrap();

    mirror(&OsFileSystem, &src, &dest, CopyOptions::new().overwrite(true)).unwrap();

    assert_eq!(std::fs::read(src.join(jar)).unwrap(), vec![0xCA; 200_000]);
    assert_eq!(std::fs::read(dest.join(jar)).unwrap(), vec![0xCA; 200_000]);
    assert!(!std::fs::symlink_metadata(dest.join(jar)).unwrap().file_type().is_symlink());
}

#[test]
fn test_copy_file_of_directory_mirrors() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    let dest = dir.path().join("dest");
    populate(&src);

    assert!(copy_file(&OsFileSystem, &src, &dest, CopyOptions::new()).unwrap());
    assert_eq!(relative_paths(&src), relative_paths(&dest));
}

struct RefusingLinker;

impl LinkCreator for RefusingLinker {
    fn create_link(&self, _src: &Path, dest: &Path) -> Result<()> {
        Err(Error::Write {
            path: dest.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Unsupported, "links disabled"),
        })
    }
}

#[test]
fn test_link_fallback_equals_copy() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("repo/a.jar");
    std::fs::create_dir_all(src.parent().unwrap()).unwrap();
    std::fs::write(&src, vec![7u8; 100_000]).unwrap();

    let linked = dir.path().join("cache/linked.jar");
    let copied = dir.path().join("cache/copied.jar");

    assert!(link(&OsFileSystem, &RefusingLinker, &src, &linked, CopyOptions::new()).unwrap());
    assert!(copy_file(&OsFileSystem, &src, &copied, CopyOptions::new()).unwrap());

    let linked_bytes = std::fs::read(&linked).unwrap();
    assert!(!linked_bytes.is_empty());
    assert_eq!(linked_bytes, std::fs::read(&copied).unwrap());
    assert_eq!(
        std::fs::metadata(&linked).unwrap().modified().unwrap(),
        std::fs::metadata(&src).unwrap().modified().unwrap()
    );
}

#[test]
fn test_mass_link_rejects_injection_before_running() {
    use stowage_fs::command::{CommandOutput, CommandRunner};

    struct Panicking;

    impl CommandRunner for Panicking {
        fn run(
            &self,
            _program: &str,
            _args: &[&std::ffi::OsStr],
            _stdin: Option<&[u8]>,
        ) -> std::io::Result<CommandOutput> {
            panic!("no process may run for a rejected batch");
        }
    }

    let dir = tempdir().unwrap();
    for bad in ["a;b", "$(id)"] {
        let pairs = vec![
            (dir.path().join("fine.jar"), dir.path().join("fine-link.jar")),
            (dir.path().join("src.jar"), dir.path().join(bad)),
        ];
        let err = mass_link(&OsFileSystem, &Panicking, pairs, true).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }
}

#[test]
fn test_cancelled_copy_is_interrupted() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("big.bin");
    let dest = dir.path().join("copy.bin");
    std::fs::write(&src, vec![1u8; 1 << 20]).unwrap();

    let token = CancelToken::new();
    let trigger = token.clone();
    let listener = move |event: &CopyProgressEvent| {
        if event.total_read() >= 128 * 1024 {
            trigger.cancel();
        }
    };

    let options = CopyOptions::new().listener(&listener).cancel(&token);
    let err = copy_file(&OsFileSystem, &src, &dest, options).unwrap_err();
    assert!(err.is_interrupted());
}

#[test]
fn test_force_delete_tree_and_missing() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("tree");
    populate(&root);

    force_delete(&OsFileSystem, &root).unwrap();
    assert!(!root.exists());
    force_delete(&OsFileSystem, &root).unwrap();
}

#[cfg(unix)]
#[test]
fn test_normalize_public_api() {
    assert_eq!(normalize("/var/cache/./ivy/../jars"), PathBuf::from("/var/cache/jars"));
    assert_eq!(normalize("/.."), PathBuf::from("/.."));
}
