//! Import, batch processing and payloads through the public API.

use resort_content::api::{self, Api, ApiError};
use resort_content::imaging::Quality;
use resort_content::import;
use resort_content::maintenance;
use resort_content::materialize::Materializer;
use resort_content::registry::Model;
use resort_content::resolver::{RequestContext, Resolver};
use resort_content::storage::MediaStorage;
use resort_content::store::{HeroSection, Restaurant, SiteSettings, Store, StoreError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, 40, (y % 256) as u8])
    });
    img.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
}

const BUNDLE: &str = r#"{
    "site_settings": { "site_name": "Lakeside", "hero_image": "img/hero.jpg" },
    "statistics": [{ "number": "25", "label": "lodges" }],
    "gallery": [{ "image": "img/pool.jpg", "position": "main", "column": "left" }],
    "lodge_types": [{
        "name": "Cabins",
        "hero_image": "img/cabins.jpg",
        "lodges": [{ "name": "Pine Cabin", "capacity": 4, "price_from": 5000,
                     "images": [{ "image": "img/pine.jpg" }] }]
    }],
    "events": [{ "title": "Weddings", "image": "img/wedding.jpg" }],
    "news": [{ "title": "Season opening", "is_published": true,
               "published_at": "2024-01-01T00:00:00Z" }]
}"#;

struct Setup {
    _tmp: TempDir,
    media: PathBuf,
    store: Store,
    materializer: Materializer,
}

fn setup() -> Setup {
    let tmp = TempDir::new().unwrap();
    let bundle_dir = tmp.path().join("bundle");
    for (name, w, h) in [
        ("hero", 1200, 700),
        ("pool", 900, 600),
        ("cabins", 1000, 500),
        ("pine", 600, 800),
        ("wedding", 700, 700),
    ] {
        write_jpeg(&bundle_dir.join(format!("img/{name}.jpg")), w, h);
    }
    let bundle = bundle_dir.join("content.json");
    std::fs::write(&bundle, BUNDLE).unwrap();

    let media = tmp.path().join("media");
    let materializer = Materializer::new(MediaStorage::new(&media, "/media/"), "CACHE/images");
    let mut store = Store::open(&tmp.path().join("resort.db")).unwrap();
    import::import_file(&mut store, materializer.storage(), &materializer, &bundle).unwrap();

    Setup {
        _tmp: tmp,
        media,
        store,
        materializer,
    }
}

#[test]
fn imported_content_renders_payloads() {
    let s = setup();
    let api = Api::new(&s.store, Resolver::new(&s.materializer, Quality::new(50)));
    let ctx = RequestContext::with_base_url("https://resort.example");

    let settings = api.site_settings(&ctx).unwrap();
    assert_eq!(settings["site_name"], "Lakeside");
    assert_eq!(
        settings["hero_image_webp_url"],
        "https://resort.example/media/CACHE/images/site/hero/hero.jpg/full.webp"
    );

    let lodges = api.lodge_types(&ctx).unwrap();
    assert_eq!(lodges[0]["lodges"][0]["slug"], "pine-cabin");
    assert_eq!(lodges[0]["lodges"][0]["price_from"], 5000.0);

    let news = api.news(&ctx).unwrap();
    assert_eq!(news[0]["slug"], "season-opening");

    let root = api::api_root(&ctx);
    assert!(root.is_object());
}

#[test]
fn batch_processing_then_prune_round() {
    let mut s = setup();

    let report =
        maintenance::process_images(&s.store, &s.materializer, &Model::ALL, None).unwrap();
    assert_eq!(report.failed(), 0);
    let rendered: usize = report.models.iter().map(|m| m.rendered).sum();
    assert!(rendered > 0);
    assert!(s.media.join("CACHE/images/events/wedding.jpg/card.webp").is_file());

    // Nothing left to do on a second pass
    let again =
        maintenance::process_images(&s.store, &s.materializer, &Model::ALL, None).unwrap();
    assert!(again.models.iter().all(|m| m.rendered == 0));

    // Removing the event discards its upload and variants
    let event = s.store.event_type_by_slug("weddings").unwrap().unwrap();
    s.store.delete_event_type(event.id, &s.materializer).unwrap();
    assert!(!s.media.join("CACHE/images/events/wedding.jpg").exists());

    let pruned = maintenance::prune_cache(&s.store, &s.materializer).unwrap();
    assert_eq!(pruned.removed, 0);
    assert!(pruned.kept > 0);
}

#[test]
fn unknown_variant_name_is_an_error() {
    let s = setup();
    let err = maintenance::regenerate_variants(
        &s.store,
        &s.materializer,
        &[Model::LodgeType],
        Some("thumb"),
    )
    .unwrap_err();
    assert!(matches!(err, maintenance::MaintenanceError::UnknownVariant(_)));
}

#[test]
fn hero_activation_keeps_one_active() {
    let mut s = setup();
    let ids: Vec<i64> = (0..3)
        .map(|i| {
            s.store
                .insert_hero_section(&HeroSection {
                    title: format!("Hero {i}"),
                    ..HeroSection::default()
                })
                .unwrap()
        })
        .collect();

    let active = s.store.activate_hero_sections(&ids).unwrap();
    assert_eq!(active, Some(ids[0]));
    assert_eq!(s.store.active_hero_section().unwrap().unwrap().id, ids[0]);

    s.store.activate_hero_sections(&ids[1..]).unwrap();
    assert_eq!(s.store.active_hero_section().unwrap().unwrap().id, ids[1]);

    let api = Api::new(&s.store, Resolver::new(&s.materializer, Quality::new(50)));
    assert_eq!(api.hero(&RequestContext::relative()).unwrap()["title"], "Hero 1");
}

#[test]
fn second_hard_singleton_is_rejected() {
    let mut s = setup();
    let err = s
        .store
        .create_site_settings(&SiteSettings {
            site_name: "Impostor".into(),
            ..SiteSettings::default()
        })
        .unwrap_err();
    assert!(matches!(err, StoreError::Singleton(_)));
    assert_eq!(s.store.site_settings().unwrap().unwrap().site_name, "Lakeside");

    s.store.create_restaurant(&Restaurant::default()).unwrap();
    assert!(matches!(
        s.store.create_restaurant(&Restaurant::default()),
        Err(StoreError::Singleton(_))
    ));
}

#[test]
fn missing_restaurant_is_not_found() {
    let s = setup();
    let api = Api::new(&s.store, Resolver::new(&s.materializer, Quality::new(50)));
    assert!(matches!(
        api.restaurant(&RequestContext::relative()),
        Err(ApiError::NotFound(_))
    ));
}
