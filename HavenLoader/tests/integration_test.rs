use havenloader::prelude::*;
use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];

fn write(root: &Path, file: &str, content: &str) {
    let path = root.join(file);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn png(root: &Path, name: &str, size: u32, color: [u8; 4]) {
    let path = root.join("textures").join(format!("{name}.png"));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(size, size, Rgba(color)).save(path).unwrap();
}

fn core_install() -> TempDir {
    let core = tempdir().unwrap();
    write(
        core.path(),
        "library/haven",
        "<data><Item><i mid='1' hp='10'/><i mid='2' hp='20'/></Item></data>",
    );
    write(core.path(), "library/texts", "<t><l id='1'>Hull</l></t>");
    write(
        core.path(),
        "library/animations",
        "<AllAnimations><animations><a n='1'><assetPos a='10'/></a></animations></AllAnimations>",
    );
    write(
        core.path(),
        "library/textures",
        "<AllTexturesAndRegions><textures><t i='1' w='16' h='16'/></textures>\
         <regions><re n='10' t='1' x='0' y='0' w='4' h='4'/></regions></AllTexturesAndRegions>",
    );
    CimImage::new(16, 16)
        .write(core.path().join("library/1.cim"))
        .unwrap();
    core
}

/// Mod A: replaces an item, overrides core region 10 and auto-packs two frames.
fn textured_mod() -> TempDir {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "library/haven.xml",
        "<data><Item><i mid='2' hp='99'/><i mid='3' hp='1'/></Item></data>",
    );
    write(
        dir.path(),
        "library/animations.xml",
        "<AllAnimations><animations><a n='500'>\
         <assetPos filename='ship'/><assetPos filename='hull'/>\
         </a></animations></AllAnimations>",
    );
    write(
        dir.path(),
        "library/textures.xml",
        "<AllTexturesAndRegions><textures/>\
         <regions><re n='10' t='1' x='0' y='0' w='4' h='4'/></regions></AllTexturesAndRegions>",
    );
    png(dir.path(), "10", 4, GREEN);
    png(dir.path(), "ship", 8, RED);
    png(dir.path(), "hull", 2, GREEN);
    dir
}

/// Mod B: redeclares mod A's item and patches the merged library.
fn patching_mod() -> TempDir {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "library/haven_items.xml",
        "<data><Item><i mid='3' hp='7'/></Item></data>",
    );
    write(
        dir.path(),
        "patches/haven.xml",
        "<Patches>\
           <Patch Class='AttributeMath'><xpath>//i[@mid='1']</xpath><attribute>hp</attribute><value opType='multiply'>3</value></Patch>\
           <Patch Class='AttributeSet'><xpath>//i[@mid='404']</xpath><attribute>hp</attribute><value>0</value></Patch>\
         </Patches>",
    );
    write(
        dir.path(),
        "patches/haven_skipped.xml",
        "<Patches><Noload/>\
           <Patch Class='Remove'><xpath>//i</xpath></Patch>\
         </Patches>",
    );
    dir
}

fn region(doc: &XmlDocument, n: u32) -> (String, u32, u32) {
    let node = doc
        .select_first(&format!("//re[@n='{n}']"))
        .unwrap()
        .unwrap_or_else(|| panic!("region {n} missing"));
    let attr = |name| doc.attribute(node, name).unwrap().to_string();
    (attr("t"), attr("x").parse().unwrap(), attr("y").parse().unwrap())
}

#[test]
fn test_full_install() {
    let core = core_install();
    let mod_a = textured_mod();
    let mod_b = patching_mod();
    let registry = StaticRegistry::new().with(mod_a.path(), 4242);

    let report = install_mods(
        core.path(),
        &[mod_a.path(), mod_b.path()],
        &registry,
        &InstallOptions::default(),
    )
    .unwrap();

    assert_eq!(report.last_core_region_id, 10);
    assert_eq!(report.regions_allocated(), 2);
    assert_eq!(report.mods[0].merge.generated_page.as_deref(), Some("4242"));
    assert_eq!(report.mods[1].patches.applied, 1);
    assert_eq!(report.mods[1].patches.missed, 1);
    assert_eq!(report.mods[1].patches.skipped_files, 1);
    assert_eq!(report.extra_assets(), vec!["library/4242.cim".to_string()]);
    assert_eq!(report.atlas.updated_pages, vec!["1".to_string()]);

    // XML was flushed: last mod wins, patches ran on the merged library
    let library = CoreLibrary::load(core.path()).unwrap();
    let haven = library.document(LibraryTarget::Haven);
    let hp = |mid: &str| {
        let node = haven.select_first(&format!("//i[@mid='{mid}']")).unwrap().unwrap();
        haven.attribute(node, "hp").unwrap().to_string()
    };
    assert_eq!(hp("1"), "30");
    assert_eq!(hp("2"), "99");
    assert_eq!(hp("3"), "7");
    assert_eq!(haven.select("//i[@mid='3']").unwrap().len(), 1);

    // Animation frames point at the allocated regions
    let animations = library.document(LibraryTarget::Animations);
    let frames: Vec<_> = animations
        .select("//a[@n='500']/assetPos")
        .unwrap()
        .into_iter()
        .map(|n| animations.attribute(n, "a").unwrap().to_string())
        .collect();
    assert_eq!(frames, vec!["11".to_string(), "12".to_string()]);

    // Generated page and region declarations were merged
    let textures = library.document(LibraryTarget::Textures);
    assert!(textures.select_first("//t[@i='4242']").unwrap().is_some());
    let (page, x, y) = region(textures, 11);
    assert_eq!(page, "4242");

    // Pixels landed in both atlas pages
    let generated = CimImage::read(core.path().join("library/4242.cim")).unwrap();
    assert_eq!(generated.pixel(x, y), Some(RED));
    let updated = CimImage::read(core.path().join("library/1.cim")).unwrap();
    assert_eq!(updated.pixel(0, 0), Some(GREEN));
    assert_eq!(updated.pixel(8, 8), Some([0, 0, 0, 0]));

    // Debug pages exported into the contributing mod only
    assert!(mod_a.path().join("textures/modded_cim_4242.png").is_file());
    assert!(mod_a.path().join("textures/modded_cim_1.png").is_file());
    assert!(!mod_b.path().join("textures").exists());
}

#[test]
fn test_install_without_debug_export() {
    let core = core_install();
    let mod_a = textured_mod();
    let registry = StaticRegistry::new().with(mod_a.path(), 4242);

    let report = install_mods(
        core.path(),
        &[mod_a.path()],
        &registry,
        &InstallOptions {
            export_debug_pages: false,
        },
    )
    .unwrap();

    assert!(report.atlas.debug_exports.is_empty());
    assert!(!mod_a.path().join("textures/modded_cim_4242.png").exists());
    assert!(core.path().join("library/4242.cim").is_file());
}

#[test]
fn test_failed_patch_keeps_core_files() {
    let core = core_install();
    let before = fs::read_to_string(core.path().join("library/haven")).unwrap();
    let broken = tempdir().unwrap();
    write(
        broken.path(),
        "patches/haven.xml",
        "<Patches><Patch Class='AttributeMath'><xpath>//i</xpath><attribute>hp</attribute><value opType='divide'>0</value></Patch></Patches>",
    );

    let err = install_mods(
        core.path(),
        &[broken.path()],
        &StaticRegistry::new(),
        &InstallOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, Error::PatchFailed { .. }));
    assert_eq!(fs::read_to_string(core.path().join("library/haven")).unwrap(), before);
}

#[test]
fn test_auto_packing_requires_prefix() {
    let core = core_install();
    let mod_a = textured_mod();

    let err = install_mods(
        core.path(),
        &[mod_a.path()],
        &StaticRegistry::new(),
        &InstallOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ModPrefixNotFound { .. }));
}

#[test]
fn test_prefix_from_info_file() {
    let core = core_install();
    let mod_a = textured_mod();
    write(mod_a.path(), "info", "<mod><name>Textured</name><prefix>77</prefix></mod>");

    let report = install_mods(
        core.path(),
        &[mod_a.path()],
        &InfoFileRegistry::new(),
        &InstallOptions::default(),
    )
    .unwrap();
    assert_eq!(report.extra_assets(), vec!["library/77.cim".to_string()]);
}
