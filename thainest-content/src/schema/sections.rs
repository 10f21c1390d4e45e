//! The site's content sections.

use serde_json::{json, Map, Value};

use super::{
    AssetSlot, Envelope, FieldSpec, ListSpec, RemoteListOps, RowStatusKey, SectionSchema,
    TokenPolicy, UpdateRoute,
};

/// Hero slider. The store keeps no token for it and only offers per-slide
/// add, delete and headline updates.
pub static SLIDES: SectionSchema = SectionSchema {
    key: "slides",
    path: "slides",
    envelope: None,
    token: TokenPolicy::Untracked,
    fields: &[],
    lists: &[ListSpec {
        name: "slides",
        pointer: "/slides",
        label: "slide",
        item_fields: &["headline", "image"],
        row_status: RowStatusKey::PerRow("slide"),
        remote: Some(RemoteListOps {
            add_path: "slides/add",
            delete_path: "slides/delete",
            update: Some(UpdateRoute {
                path: "slides/update-headline",
                field: "headline",
            }),
            add_fields: &["headline"],
            required_fields: &["headline"],
            add_status_key: "addSlide",
        }),
        new_row: None,
        asset_dir: Some("src/components/Slider"),
        image_field: Some("image"),
    }],
    assets: &[],
    asset_upload_path: None,
};

pub static WELCOME: SectionSchema = SectionSchema {
    key: "nestwelcome",
    path: "nestwelcome-content",
    envelope: Some(Envelope::Flat),
    token: TokenPolicy::Required,
    fields: &[
        FieldSpec::text("title", "/title"),
        FieldSpec::text("subtitle", "/subtitle"),
        FieldSpec::text("description", "/description"),
        FieldSpec::text("bookButton.text", "/bookButton/text"),
        FieldSpec::text("bookButton.link", "/bookButton/link"),
        FieldSpec::text("viewAllButton.text", "/viewAllButton/text"),
        FieldSpec::text("viewAllButton.link", "/viewAllButton/link"),
    ],
    lists: &[],
    assets: &[],
    asset_upload_path: None,
};

pub static ABOUT_US: SectionSchema = SectionSchema {
    key: "aboutus",
    path: "aboutus-content",
    envelope: Some(Envelope::Wrapped("aboutusContent")),
    token: TokenPolicy::Required,
    fields: &[
        FieldSpec::text("nurturingTitle", "/nurturingTitle"),
        FieldSpec::text("nurturingDesc", "/nurturingDesc"),
        FieldSpec::text("servicesTitle", "/servicesTitle"),
        FieldSpec::text("servicesDesc", "/servicesDesc"),
    ],
    lists: &[ListSpec {
        name: "serviceCards",
        pointer: "/serviceCards",
        label: "service card",
        item_fields: &["image", "alt", "buttonText", "link"],
        row_status: RowStatusKey::Shared("serviceCard"),
        remote: Some(RemoteListOps {
            add_path: "aboutus/service-card/add",
            delete_path: "aboutus/service-card/delete",
            update: None,
            add_fields: &["alt", "buttonText", "link"],
            required_fields: &[],
            add_status_key: "serviceCard",
        }),
        new_row: None,
        asset_dir: Some("src/components/Aboutus"),
        image_field: Some("image"),
    }],
    assets: &[],
    asset_upload_path: None,
};

pub static BLOG: SectionSchema = SectionSchema {
    key: "blogsection",
    path: "blogsection-config",
    envelope: Some(Envelope::Wrapped("blogSectionConfig")),
    token: TokenPolicy::Required,
    fields: &[
        FieldSpec::text("envText.left", "/envText/left"),
        FieldSpec::text("envText.right", "/envText/right"),
        FieldSpec::lines("interiorText", "/interiorText"),
        FieldSpec::text("wellnessJournalTitle", "/wellnessJournalTitle"),
        FieldSpec::text("reconnectSection.title1", "/reconnectSection/title1"),
        FieldSpec::text("reconnectSection.title2", "/reconnectSection/title2"),
        FieldSpec::text("reconnectSection.desc", "/reconnectSection/desc"),
        FieldSpec::text("reconnectSection.button.text", "/reconnectSection/button/text"),
        FieldSpec::text("reconnectSection.button.url", "/reconnectSection/button/url"),
    ],
    lists: &[ListSpec {
        name: "blogPosts",
        pointer: "/blogPosts",
        label: "blog post",
        item_fields: &["image", "alt", "title", "link"],
        row_status: RowStatusKey::Shared("blogpost"),
        remote: Some(RemoteListOps {
            add_path: "blogsection/blogpost/add",
            delete_path: "blogsection/blogpost/delete",
            update: None,
            add_fields: &["alt", "title", "link"],
            required_fields: &[],
            add_status_key: "blogpost",
        }),
        new_row: None,
        asset_dir: Some("src/components/Blog"),
        image_field: Some("image"),
    }],
    assets: &[],
    asset_upload_path: None,
};

pub static CONTACT: SectionSchema = SectionSchema {
    key: "contact",
    path: "contact-config",
    envelope: Some(Envelope::Wrapped("contactConfig")),
    token: TokenPolicy::Required,
    fields: &[
        FieldSpec::text("title", "/title"),
        FieldSpec::text("phone", "/phone"),
        FieldSpec::text("address", "/address"),
        FieldSpec::text("facebook.name", "/facebook/name"),
        FieldSpec::text("facebook.url", "/facebook/url"),
        FieldSpec::text("operationTitle", "/operationTitle"),
        FieldSpec::text("operationNote", "/operationNote"),
    ],
    lists: &[ListSpec {
        name: "operationHours",
        pointer: "/operationHours",
        label: "operation hour",
        item_fields: &["day", "time"],
        row_status: RowStatusKey::Shared("contact"),
        remote: None,
        new_row: Some(blank_hours_row),
        asset_dir: None,
        image_field: None,
    }],
    assets: &[],
    asset_upload_path: None,
};

pub static SERVICES: SectionSchema = SectionSchema {
    key: "services",
    path: "services-config",
    envelope: Some(Envelope::Wrapped("servicesConfig")),
    token: TokenPolicy::Required,
    fields: &[
        FieldSpec::text("hero.experienceText", "/hero/experienceText"),
        FieldSpec::text("bookBtn.text", "/bookBtn/text"),
        FieldSpec::text("bookBtn.url", "/bookBtn/url"),
    ],
    lists: &[
        ListSpec {
            name: "centerImages",
            pointer: "/hero/centerImages",
            label: "center image",
            item_fields: &[],
            row_status: RowStatusKey::Shared("services"),
            remote: None,
            new_row: None,
            asset_dir: None,
            image_field: None,
        },
        ListSpec {
            name: "massageServices",
            pointer: "/massageServices",
            label: "massage card",
            item_fields: &["img", "title", "desc"],
            row_status: RowStatusKey::Shared("services"),
            remote: None,
            new_row: Some(new_massage_card),
            asset_dir: Some("public/assets/images"),
            image_field: Some("img"),
        },
        ListSpec {
            name: "facialServices",
            pointer: "/facialServices",
            label: "facial card",
            item_fields: &["img", "title", "desc"],
            row_status: RowStatusKey::Shared("services"),
            remote: None,
            new_row: Some(new_facial_card),
            asset_dir: Some("public/assets/images"),
            image_field: Some("img"),
        },
    ],
    assets: &[
        AssetSlot {
            name: "heroImg",
            upload_type: "heroImg",
            file_name: hero_image_name,
            asset_dir: "public/assets/images",
            reload: false,
        },
        AssetSlot {
            name: "centerImage",
            upload_type: "centerImage",
            file_name: center_image_name,
            asset_dir: "public/assets/images",
            reload: true,
        },
    ],
    asset_upload_path: Some("services/upload-svg"),
};

/// Every section in display order.
pub static ALL: &[&SectionSchema] = &[&SLIDES, &WELCOME, &ABOUT_US, &BLOG, &CONTACT, &SERVICES];

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn blank_hours_row(_count: usize) -> Map<String, Value> {
    object(json!({ "day": "", "time": "" }))
}

// Massage card images are numbered from 1, facial cards from 9.
fn new_massage_card(count: usize) -> Map<String, Value> {
    object(json!({ "img": format!("/assets/images/{}.svg", count + 1), "title": "", "desc": "" }))
}

fn new_facial_card(count: usize) -> Map<String, Value> {
    object(json!({ "img": format!("/assets/images/{}.svg", count + 9), "title": "", "desc": "" }))
}

fn hero_image_name(_index: usize) -> String {
    "servicesimg.svg".to_string()
}

fn center_image_name(index: usize) -> String {
    if index == 0 {
        "4img.svg".to_string()
    } else {
        "4img2.svg".to_string()
    }
}
