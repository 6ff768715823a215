use serde::Serialize;
use serde_json::{json, Map, Value};

use super::{Layer, MapDocument, Popup};
use crate::error::Result;

const LEAFLET_CSS: &str = "https://cdn.jsdelivr.net/npm/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://cdn.jsdelivr.net/npm/leaflet@1.9.4/dist/leaflet.js";
const HEAT_JS: &str = "https://cdn.jsdelivr.net/npm/leaflet.heat@0.2.0/dist/leaflet-heat.js";
const MEASURE_CSS: &str =
    "https://cdn.jsdelivr.net/npm/leaflet-measure@3.1.0/dist/leaflet-measure.css";
const MEASURE_JS: &str =
    "https://cdn.jsdelivr.net/npm/leaflet-measure@3.1.0/dist/leaflet-measure.min.js";

/// Serialize a value as a JavaScript literal that is safe inside `<script>`.
/// `<` only occurs inside JSON strings, where `\u003c` means the same.
fn js<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace('<', "\\u003c"))
}

fn bind_popup(var: &str, popup: &Popup) -> Result<String> {
    Ok(format!(
        "{var}.bindPopup({}, {});",
        js(&popup.html)?,
        js(&json!({ "maxWidth": popup.max_width }))?
    ))
}

fn bind_tooltip(var: &str, html: &str) -> Result<String> {
    Ok(format!("{var}.bindTooltip({}, {{\"sticky\": true}});", js(html)?))
}

fn layer_script(index: usize, layer: &Layer) -> Result<Vec<String>> {
    let var = format!("layer_{index}");
    let mut lines = Vec::new();

    match layer {
        Layer::Marker {
            location,
            popup,
            tooltip,
            icon,
        } => {
            let options = match icon {
                Some(icon) => {
                    let icon_options = json!({
                        "iconUrl": icon.url,
                        "iconSize": [icon.size.0, icon.size.1],
                    });
                    lines.push(format!("var {var}_icon = L.icon({});", js(&icon_options)?));
                    format!("{{\"icon\": {var}_icon}}")
                }
                None => "{}".to_string(),
            };
            lines.push(format!(
                "var {var} = L.marker({}, {options}).addTo(map);",
                js(&[location.0, location.1])?
            ));
            if let Some(popup) = popup {
                lines.push(bind_popup(&var, popup)?);
            }
            if let Some(tooltip) = tooltip {
                lines.push(bind_tooltip(&var, tooltip)?);
            }
        }
        Layer::CircleMarker {
            location,
            radius,
            color,
            fill_color,
            popup,
            tooltip,
        } => {
            let mut options = json!({ "radius": radius, "color": color });
            if let Some(fill) = fill_color {
                options["fill"] = Value::Bool(true);
                options["fillColor"] = Value::String(fill.clone());
                options["fillOpacity"] = json!(0.7);
            }
            lines.push(format!(
                "var {var} = L.circleMarker({}, {}).addTo(map);",
                js(&[location.0, location.1])?,
                js(&options)?
            ));
            if let Some(popup) = popup {
                lines.push(bind_popup(&var, popup)?);
            }
            if let Some(tooltip) = tooltip {
                lines.push(bind_tooltip(&var, tooltip)?);
            }
        }
        Layer::HeatMap {
            name,
            points,
            radius,
            min_opacity,
            gradient,
        } => {
            let points: Vec<[f64; 2]> = points.iter().map(|&(lat, lon)| [lat, lon]).collect();
            let gradient: Map<String, Value> = gradient
                .iter()
                .map(|(stop, color)| (stop.to_string(), Value::String(color.clone())))
                .collect();
            let options = json!({
                "radius": radius,
                "minOpacity": min_opacity,
                "gradient": gradient,
            });
            lines.push(format!(
                "var {var} = L.heatLayer({}, {}).addTo(map);",
                js(&points)?,
                js(&options)?
            ));
            lines.push(format!("overlays[{}] = {var};", js(name)?));
        }
        Layer::Polygon {
            name,
            coordinates,
            popup,
        } => {
            let feature = json!({
                "type": "Feature",
                "properties": { "name": name },
                "geometry": { "type": "Polygon", "coordinates": coordinates },
            });
            lines.push(format!("var {var} = L.geoJSON({}).addTo(map);", js(&feature)?));
            if let Some(popup) = popup {
                lines.push(bind_popup(&var, popup)?);
            }
            lines.push(format!("overlays[{}] = {var};", js(name)?));
        }
    }

    Ok(lines)
}

/// Render a complete, standalone Leaflet HTML page.
pub fn render_html(doc: &MapDocument) -> Result<String> {
    let (tile_url, attribution, tile_name) = doc.tiles.resolve();

    let mut head = vec![
        format!("<link rel=\"stylesheet\" href=\"{LEAFLET_CSS}\"/>"),
        format!("<script src=\"{LEAFLET_JS}\"></script>"),
    ];
    if doc.has_heatmap() {
        head.push(format!("<script src=\"{HEAT_JS}\"></script>"));
    }
    if doc.measure_control {
        head.push(format!("<link rel=\"stylesheet\" href=\"{MEASURE_CSS}\"/>"));
        head.push(format!("<script src=\"{MEASURE_JS}\"></script>"));
    }

    let mut script = vec![
        format!(
            "var map = L.map(\"map\", {});",
            js(&json!({
                "center": [doc.center.0, doc.center.1],
                "zoom": doc.zoom,
            }))?
        ),
        "var base_layers = {};".to_string(),
        "var overlays = {};".to_string(),
        format!(
            "var tiles = L.tileLayer({}, {}).addTo(map);",
            js(&tile_url)?,
            js(&json!({ "attribution": attribution, "maxZoom": 19 }))?
        ),
        format!("base_layers[{}] = tiles;", js(&tile_name)?),
    ];

    for (index, layer) in doc.layers.iter().enumerate() {
        script.extend(layer_script(index, layer)?);
    }

    if doc.layer_control {
        script.push(format!(
            "L.control.layers(base_layers, overlays, {}).addTo(map);",
            js(&json!({ "collapsed": true }))?
        ));
    }
    if doc.measure_control {
        script.push(format!(
            "L.control.measure({}).addTo(map);",
            js(&json!({ "primaryLengthUnit": "meters", "primaryAreaUnit": "sqmeters" }))?
        ));
    }

    let indent = |lines: Vec<String>, pad: &str| {
        lines
            .into_iter()
            .map(|l| format!("{pad}{l}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8"/>
    <meta name="viewport" content="width=device-width, initial-scale=1.0"/>
{head}
    <style>
        html, body {{ width: 100%; height: 100%; margin: 0; padding: 0; }}
        #map {{ position: absolute; top: 0; bottom: 0; right: 0; left: 0; }}
    </style>
</head>
<body>
    <div id="map"></div>
    <script>
{script}
    </script>
</body>
</html>
"#,
        head = indent(head, "    "),
        script = indent(script, "        "),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{madrid_central_polygon, Icon, Tiles};

    fn document() -> MapDocument {
        MapDocument::new((40.4167598, -3.7040395), 13, Tiles::default())
    }

    #[test]
    fn test_empty_map() {
        let html = render_html(&document()).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("\"center\":[40.4167598,-3.7040395]"));
        assert!(html.contains("\"zoom\":13"));
        assert!(html.contains("tile.openstreetmap.org"));
        assert!(!html.contains("leaflet-heat.js"));
        assert!(!html.contains("L.control.layers"));
    }

    #[test]
    fn test_marker_popup_is_script_safe() {
        let mut doc = document();
        doc.layers.push(Layer::Marker {
            location: (40.42, -3.70),
            popup: Some(Popup {
                html: "</script><b>Sol</b>".into(),
                max_width: 900,
            }),
            tooltip: Some("Sol".into()),
            icon: Some(Icon {
                url: "data:image/png;base64,AA==".into(),
                size: (40, 40),
            }),
        });

        let html = render_html(&doc).unwrap();
        assert!(html.contains(
            "L.icon({\"iconSize\":[40,40],\"iconUrl\":\"data:image/png;base64,AA==\"})"
        ));
        assert!(html.contains("L.marker([40.42,-3.7], {\"icon\": layer_0_icon})"));
        assert!(html.contains(
            "layer_0.bindPopup(\"\\u003c/script>\\u003cb>Sol\\u003c/b>\", {\"maxWidth\":900});"
        ));
        assert!(html.contains("layer_0.bindTooltip(\"Sol\""));
        assert_eq!(html.matches("</script>").count(), 2);
    }

    #[test]
    fn test_tile_attribution_cannot_open_markup() {
        let doc = MapDocument::new(
            (40.4, -3.7),
            13,
            Tiles::Custom {
                url: "https://tiles.example.org/{z}/{x}/{y}.png".into(),
                attribution: "<!--<script>alert(1)</script>".into(),
            },
        );

        let html = render_html(&doc).unwrap();
        assert!(!html.contains("<!--"));
        assert!(html.contains("\\u003c!--\\u003cscript>alert(1)\\u003c/script>"));
        assert_eq!(html.matches("<script").count(), 2);
    }

    #[test]
    fn test_heatmap_polygon_and_controls() {
        let mut doc = document();
        doc.layers.push(Layer::HeatMap {
            name: "Tráfico".into(),
            points: vec![(40.4, -3.7)],
            radius: 14.0,
            min_opacity: 0.8,
            gradient: vec![(0.4, "blue".into()), (1.0, "red".into())],
        });
        doc.layers.push(Layer::Polygon {
            name: "Madrid Central".into(),
            coordinates: madrid_central_polygon(),
            popup: None,
        });
        doc.layer_control = true;
        doc.measure_control = true;

        let html = render_html(&doc).unwrap();
        assert!(html.contains("leaflet-heat.js"));
        assert!(html.contains("L.heatLayer([[40.4,-3.7]]"));
        assert!(html.contains("\"gradient\":{\"0.4\":\"blue\",\"1\":\"red\"}"));
        assert!(html.contains("overlays[\"Tráfico\"] = layer_0;"));
        assert!(html.contains("L.geoJSON({"));
        assert!(html.contains("[-3.711305,40.406807]"));
        assert!(html.contains("overlays[\"Madrid Central\"] = layer_1;"));
        assert!(html.contains("L.control.layers(base_layers, overlays"));
        assert!(html.contains("L.control.measure("));
    }

    #[test]
    fn test_circle_marker_fill() {
        let mut doc = document();
        doc.layers.push(Layer::CircleMarker {
            location: (40.4, -3.7),
            radius: 2.0,
            color: "#ff0000".into(),
            fill_color: Some("#ff0000".into()),
            popup: None,
            tooltip: None,
        });

        let html = render_html(&doc).unwrap();
        assert!(html.contains("L.circleMarker([40.4,-3.7]"));
        assert!(html.contains("\"fillColor\":\"#ff0000\""));
    }
}
