// Copied next to a generated output directory and built as a binary by
// tests/generated_code.rs.

mod generated;

use generated::{
    serialize, KitchenSink, MeasuredMaterial, OptionPlugin, Plugin, PluginRef, SceneBuilder,
    SmoothDiffuseMaterial, Sphere, Transform, Value, ValuePlugin,
};

fn string(s: &str) -> Value {
    Value::String(s.into())
}

fn keys(plugin: &impl Plugin) -> Vec<String> {
    plugin.to_dict().keys().cloned().collect()
}

fn main() {
    let mut builder = SceneBuilder::new();
    let white = builder.add_asset(SmoothDiffuseMaterial::new().reflectance([0.9, 0.9, 0.9]));

    let sink = KitchenSink::new(
        1.5,
        2,
        true,
        "label",
        [1.0, 0.5, 0.0],
        0.25,
        Transform::new().translate(0.0, 1.0, 0.0),
        white.clone(),
    )
    .id("sink")
    .id_2("documented")
    .new_2(3.0)
    .fields_2(4)
    .plugin_type_2("variant")
    .do_(true)
    .abstract_(false)
    .become_(true)
    .type_("shadowed")
    ._2d_grid(0.5)
    .ref_("r");

    assert_eq!(sink.plugin_type(), "kitchensink");
    assert_eq!(sink.id_2.as_deref(), Some("documented"));
    assert_eq!(
        keys(&sink),
        vec![
            "type", "id", "weight", "count", "enabled", "label", "tint", "albedo", "to_world",
            "material", "new", "fields", "plugin_type", "do", "abstract", "become", "2d_grid",
            "ref",
        ]
    );

    let dict = sink.to_dict();
    assert_eq!(dict["type"], string("kitchensink"));
    assert_eq!(dict["id"], string("sink"));
    assert_eq!(dict["weight"], Value::Float(1.5));
    assert_eq!(dict["count"], Value::Int(2));
    assert_eq!(dict["enabled"], Value::Bool(true));
    assert_eq!(dict["label"], string("label"));
    assert_eq!(dict["albedo"], Value::Float(0.25));
    assert!(matches!(dict["to_world"], Value::Matrix(_)));
    assert_eq!(dict["new"], Value::Float(3.0));
    assert_eq!(dict["fields"], Value::Int(4));
    assert_eq!(dict["do"], Value::Bool(true));
    assert_eq!(dict["2d_grid"], Value::Float(0.5));
    assert_eq!(
        dict["material"],
        serialize(&Value::Plugin(PluginRef::new(white.clone())))
    );

    let measured = MeasuredMaterial::new("data.bsdf").use_grid(true).type_("rgb");
    assert_eq!(keys(&measured), vec!["type", "filename", "use_grid"]);

    assert_eq!(OptionPlugin::default().scale, None);
    assert_eq!(ValuePlugin::new().scale(2.0).scale, Some(2.0));

    let scene = builder
        .shape("ball", Sphere::new().radius(2.0).bsdf(white))
        .shape("sink", sink)
        .asset(ValuePlugin::new().scale(2.0))
        .asset(OptionPlugin::default())
        .build();
    let dict = scene.to_dict();
    let scene_keys: Vec<&str> = dict.keys().map(String::as_str).collect();
    assert_eq!(
        scene_keys,
        vec!["type", "ball", "sink", "asset_1", "asset_2", "asset_3"]
    );

    let json = serde_json::to_value(Value::Map(dict)).unwrap();
    assert_eq!(json["sink"]["type"], "kitchensink");
    assert_eq!(json["ball"]["bsdf"]["type"], "ref");
    assert_eq!(json["asset_3"]["id"], "asset_3");
}
