extern crate conveyor;

use std::fs;
use std::sync::Arc;

use conveyor::prelude::*;

#[test]
fn driver() {
    let mut driver = FilesystemDriver::new();

    assert!(!driver.exists("/res/mock.txt"));

    let fs = DirectoryFS::new("tests/assets").unwrap();
    driver.mount("res", fs).unwrap();

    // canonicalized
    assert!(driver.exists("/res/mock.txt"));
    assert!(driver.exists("/res//mock.txt"));
    assert!(driver.exists("/res/./mock.txt"));
    assert!(!driver.exists("/res/missing.txt"));
    assert!(!driver.exists("/other/mock.txt"));

    assert_eq!(driver.len("/res/mock.txt").unwrap(), 13);

    let mut buf = Vec::new();
    driver.load_into("/res/mock.txt", &mut buf).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "Hello, World!");

    // A second mount under the same identifier is refused.
    assert!(driver
        .mount("res", DirectoryFS::new("tests/assets").unwrap())
        .is_err());

    driver.unmount("res");
    assert!(!driver.exists("/res/mock.txt"));
}

#[test]
fn dir() {
    assert!(DirectoryFS::new("tests/_invalid_path_").is_err());

    let fs = DirectoryFS::new("tests/assets").unwrap();
    assert!(fs.exists("mock.txt".as_ref()));
    assert_eq!(fs.len("mock.txt".as_ref()).unwrap(), 13);

    let mut buf = Vec::new();
    fs.load_into("mock.txt".as_ref(), &mut buf).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "Hello, World!");
}

#[test]
fn archive_behind_driver() {
    let path = std::env::temp_dir().join("conveyor-vfs-test.cvyr");

    {
        let mut builder = ArchiveBuilder::new();
        builder.add("foo/mock.prefab", b"mock".to_vec());
        builder.add("mock.txt", b"Hello, World!".to_vec());
        builder.write_to(fs::File::create(&path).unwrap()).unwrap();
    }

    let mut driver = FilesystemDriver::new();
    driver.mount("res", ArchiveFS::new(&path).unwrap()).unwrap();

    assert!(driver.exists("/res/foo/mock.prefab"));
    assert!(!driver.exists("/res/foo/missing.prefab"));
    assert_eq!(driver.len("/res/mock.txt").unwrap(), 13);

    let mut buf = Vec::new();
    driver.load_into("/res/foo/mock.prefab", &mut buf).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "mock");

    let _ = fs::remove_file(&path);
}

#[test]
fn fs_location() {
    let mut driver = FilesystemDriver::new();
    driver
        .mount("res", DirectoryFS::new("tests/assets").unwrap())
        .unwrap();
    let driver = Arc::new(driver);

    // The length is captured at construction.
    let location = FsLocation::new(driver.clone(), "/res/mock.txt").unwrap();
    assert_eq!(location.data_size(), 13);

    let mut buf = vec![0u8; 13];
    location.fetch_data(&mut buf).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "Hello, World!");

    // A location over an unknown file fails at link time, not inside a
    // channel.
    assert!(FsLocation::new(driver, "/res/missing.txt").is_err());
}

#[test]
fn bytes_location() {
    let location = BytesLocation::new(vec![1u8, 2, 3]);
    assert_eq!(location.data_size(), 3);

    let mut buf = vec![0u8; 3];
    location.fetch_data(&mut buf).unwrap();
    assert_eq!(buf, vec![1, 2, 3]);

    let mut wrong = vec![0u8; 2];
    assert!(location.fetch_data(&mut wrong).is_err());
}
