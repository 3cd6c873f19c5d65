use j3dkit::anim::resample::resample;
use j3dkit::prelude::*;
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::tempdir;

fn write(path: &Path, data: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
}

fn walk_files(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<_> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap();
            let name = relative.to_string_lossy().replace('\\', "/");
            (name, std::fs::read(e.path()).unwrap())
        })
        .collect();
    files.sort();
    files
}

fn joint_animation() -> JointAnimation {
    let mut anim = JointAnimation::new(LoopMode::Loop, 0, 8);
    anim.tangent_type = TangentType::InOut;
    let mut joint = Transform::from_components(std::array::from_fn(|_| Channel::constant(0.0)));
    joint.scale = [Channel::constant(1.0), Channel::constant(1.0), Channel::constant(1.0)];
    joint.translation[0] = Channel::from_points(&[(0.0, 0.0), (4.0, 8.0), (8.0, 0.0)], Interpolation::Linear);
    anim.joints = vec![joint];
    anim
}

#[test]
fn test_directory_archive_round_trip() {
    let temp = tempdir().unwrap();
    let source = temp.path().join("stage");
    write(&source.join("scene.bin"), &[1, 2, 3, 4]);
    write(&source.join("map/map.col"), &vec![0x5A; 300]);
    write(&source.join("map/pollution/H_ma_rak.bmp"), b"BMP image");
    write(&source.join("mario/wait.bck"), &joint_animation().to_bytes().unwrap());
    std::fs::create_dir_all(source.join("empty")).unwrap();

    let archive = Archive::from_dir(&source).unwrap();
    let options = EncodeOptions::new().with_compression(true);
    let bytes = encode_with(&Asset::Archive(archive.clone()), &options).unwrap();
    assert_eq!(&bytes[..4], b"Yaz0");

    let Asset::Archive(decoded) = decode(&bytes).unwrap() else {
        panic!("expected an archive");
    };
    assert_eq!(decoded.to_bytes().unwrap(), archive.to_bytes().unwrap());

    let out = temp.path().join("out");
    decoded.extract_to(&out).unwrap();
    assert_eq!(walk_files(&out.join("stage")), walk_files(&source));
    assert!(out.join("stage/empty").is_dir());
}

#[test]
fn test_animation_inside_archive() {
    let mut archive = Archive::new("scene");
    let mut mario = Directory::new("mario");
    mario.insert_file(ArchiveFile::new("wait.bck", joint_animation().to_bytes().unwrap()));
    archive.root.insert_dir(mario);

    let bytes = encode(&Asset::Archive(archive)).unwrap();
    let archive = Archive::from_bytes(&bytes).unwrap();
    let file = archive.root.file("mario/wait.bck").unwrap();
    let Asset::Animation(Animation::Joint(anim)) = decode(&file.data).unwrap() else {
        panic!("expected a bck");
    };
    assert_eq!(anim, joint_animation());
}

#[test]
fn test_table_json_round_trip() {
    let anim = Animation::Joint(joint_animation());
    let json = serde_json::to_string_pretty(&anim.to_table()).unwrap();
    let table: AnimationTable = serde_json::from_str(&json).unwrap();
    let rebuilt = Animation::from_table(&table).unwrap();
    assert_eq!(rebuilt.to_bytes().unwrap(), anim.to_bytes().unwrap());
}

#[test]
fn test_resample_to_file() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("wait.bca");
    let sampled = resample(&Animation::Joint(joint_animation())).unwrap();
    write_asset(&path, &Asset::Animation(sampled), &EncodeOptions::default()).unwrap();

    let Asset::Animation(Animation::SampledJoint(bca)) = read_asset(&path).unwrap() else {
        panic!("expected a bca");
    };
    assert_eq!(
        bca.joints[0].translation[0],
        vec![0.0, 2.0, 4.0, 6.0, 8.0, 6.0, 4.0, 2.0, 0.0]
    );
}

#[test]
fn test_batch_extract_tree() {
    let source = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let mut archive = Archive::new("res");
    archive.root.insert_file(ArchiveFile::new("a.txt", b"hello".to_vec()));
    let compressed = encode_with(&Asset::Archive(archive), &EncodeOptions::new().with_compression(true)).unwrap();
    write(&source.path().join("levels/one.szs"), &compressed);
    write(&source.path().join("two.arc"), &compressed);

    let files = find_archive_files(source.path());
    assert_eq!(files.len(), 2);
    let result = batch_extract(&files, source.path(), dest.path(), |_| {});
    assert_eq!(result.success_count, 2);
    assert_eq!(result.fail_count, 0);
    assert_eq!(std::fs::read(dest.path().join("levels/one/res/a.txt")).unwrap(), b"hello");
    assert_eq!(std::fs::read(dest.path().join("two/res/a.txt")).unwrap(), b"hello");
}
