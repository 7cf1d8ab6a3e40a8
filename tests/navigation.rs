use lopdf::{dictionary, Document, Object, ObjectId};
use toc_report::links::{apply_navigation, Navigation, NavigationError, OutlineItem};
use toc_report::pass::{AnchorPlacement, LinkRegion};

fn two_page_pdf() -> Vec<u8> {
    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let kids: Vec<Object> = (0..2)
        .map(|_| {
            document
                .add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                })
                .into()
        })
        .collect();
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => 2,
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    document.save_to(&mut bytes).expect("write test PDF");
    bytes
}

fn anchor(name: &str, page: u32) -> AnchorPlacement {
    AnchorPlacement {
        name: name.to_owned(),
        page,
        top: 700.0,
    }
}

fn link(page: u32, target: &str) -> LinkRegion {
    LinkRegion {
        page,
        rect: [72.0, 700.0, 144.0, 714.0],
        anchor: target.to_owned(),
    }
}

fn catalog_entry(document: &Document, key: &[u8]) -> ObjectId {
    let root = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .expect("catalog reference");
    document
        .get_dictionary(root)
        .expect("catalog")
        .get(key)
        .and_then(Object::as_reference)
        .expect("catalog entry")
}

#[test]
fn adds_destinations_links_and_outline() {
    let navigation = Navigation {
        anchors: vec![anchor("a1", 2), anchor("a2", 2)],
        links: vec![link(1, "a1"), link(1, "a2")],
        outline: vec![
            OutlineItem {
                title: "標題0".to_owned(),
                anchor: "a1".to_owned(),
            },
            OutlineItem {
                title: "標題1".to_owned(),
                anchor: "a2".to_owned(),
            },
        ],
    };
    let bytes = apply_navigation(&two_page_pdf(), &navigation).expect("apply navigation");
    let document = Document::load_mem(&bytes).expect("reload");
    let pages = document.get_pages();

    let dests = document
        .get_dictionary(catalog_entry(&document, b"Dests"))
        .expect("dests");
    let destination = dests
        .get(b"a1")
        .and_then(Object::as_array)
        .expect("destination array");
    assert_eq!(destination[0].as_reference().ok(), pages.get(&2).copied());
    assert_eq!(destination[1].as_name().ok(), Some(&b"XYZ"[..]));

    let first_page = document.get_dictionary(pages[&1]).expect("page one");
    let annots = first_page
        .get(b"Annots")
        .and_then(Object::as_array)
        .expect("annotations");
    assert_eq!(annots.len(), 2);
    let annot = document
        .get_dictionary(annots[0].as_reference().expect("reference"))
        .expect("annotation");
    assert_eq!(annot.get(b"Subtype").and_then(Object::as_name).ok(), Some(&b"Link"[..]));
    assert_eq!(annot.get(b"Dest").and_then(Object::as_name).ok(), Some(&b"a1"[..]));

    let second_page = document.get_dictionary(pages[&2]).expect("page two");
    assert!(second_page.get(b"Annots").is_err());

    let outlines = document
        .get_dictionary(catalog_entry(&document, b"Outlines"))
        .expect("outlines");
    assert_eq!(outlines.get(b"Count").and_then(Object::as_i64).ok(), Some(2));
    let first = document
        .get_dictionary(
            outlines
                .get(b"First")
                .and_then(Object::as_reference)
                .expect("first item"),
        )
        .expect("outline item");
    assert!(first.get(b"Next").is_ok());
    assert!(first.get(b"Prev").is_err());
}

#[test]
fn link_to_unplaced_anchor_is_rejected() {
    let navigation = Navigation {
        anchors: vec![anchor("a1", 1)],
        links: vec![link(1, "missing")],
        outline: Vec::new(),
    };
    let err = apply_navigation(&two_page_pdf(), &navigation).expect_err("dangling link");
    assert!(matches!(err, NavigationError::UndefinedAnchor(name) if name == "missing"));
}

#[test]
fn anchor_on_missing_page_is_rejected() {
    let navigation = Navigation {
        anchors: vec![anchor("a1", 5)],
        ..Navigation::default()
    };
    let err = apply_navigation(&two_page_pdf(), &navigation).expect_err("page 5 does not exist");
    assert!(matches!(err, NavigationError::MissingPage { page: 5, .. }));
}
