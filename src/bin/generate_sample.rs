//! Writes sample station files into the data directory (first argument,
//! default `./resources/data/`) so every subcommand works out of the box:
//!
//! * `madrid_air_quality_stations.csv` – `;` separated, ISO-8859-1, 26 columns
//!   with longitude/latitude in columns 24/25 (`example-map` defaults)
//! * `traffic_stations.csv` – `,` separated, UTF-8, latitude/longitude in
//!   columns 4/5 (`heat-map` and `traffic-map` defaults)

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform value in `[low, high)`.
    fn range(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }
}

const CENTER: (f64, f64) = (40.4167598, -3.7040395);

const AIR_STATIONS: [(&str, &str, &str); 8] = [
    ("28079004", "Pza. de España", "Urbana tráfico"),
    ("28079008", "Escuelas Aguirre", "Urbana tráfico"),
    ("28079011", "Avda. Ramón y Cajal", "Urbana tráfico"),
    ("28079016", "Arturo Soria", "Urbana fondo"),
    ("28079024", "Casa de Campo", "Suburbana"),
    ("28079035", "Pza. del Carmen", "Urbana fondo"),
    ("28079049", "Parque del Retiro", "Urbana fondo"),
    ("28079058", "El Pardo", "Suburbana"),
];

/// ISO-8859-1 bytes of a string; fails on characters outside Latin-1.
fn encode_latin1(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| match u8::try_from(c) {
            Ok(b) => Ok(b),
            Err(_) => bail!("'{c}' cannot be written as ISO-8859-1"),
        })
        .collect()
}

fn air_quality_csv(rng: &mut SimpleRng) -> Result<Vec<u8>> {
    let mut headers: Vec<String> = ["CODIGO", "CODIGO_CORTO", "ESTACION", "DIRECCION", "NOM_TIPO"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    headers.extend((headers.len()..24).map(|i| format!("CAMPO_{i}")));
    headers.push("LONGITUD".to_string());
    headers.push("LATITUD".to_string());

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());
    writer.write_record(&headers)?;

    for (code, name, kind) in AIR_STATIONS {
        let lat = CENTER.0 + rng.range(-0.06, 0.06);
        let lon = CENTER.1 + rng.range(-0.08, 0.08);

        let mut row = vec![
            code.to_string(),
            code[code.len() - 2..].to_string(),
            name.to_string(),
            format!("C/ {name}"),
            kind.to_string(),
        ];
        row.extend((row.len()..24).map(|_| format!("{:.1}", rng.range(0.0, 100.0))));
        // Decimal commas, as in the published open data files.
        row.push(format!("{lon:.6}").replace('.', ","));
        row.push(format!("{lat:.6}").replace('.', ","));
        writer.write_record(&row)?;
    }

    let text = String::from_utf8(writer.into_inner().context("flushing CSV writer")?)?;
    encode_latin1(&text)
}

fn traffic_csv(rng: &mut SimpleRng) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["tipo_elem", "distrito", "id", "nombre", "latitud", "longitud"])?;

    let kinds = ["URB", "M30"];
    for id in 0..120u32 {
        // Cluster around the centre, as real traffic sensors are.
        let spread = if id % 3 == 0 { 0.12 } else { 0.03 };
        let lat = CENTER.0 + rng.range(-spread, spread);
        let lon = CENTER.1 + rng.range(-spread, spread);
        writer.write_record([
            kinds[(id % 2) as usize].to_string(),
            format!("{}", 1 + id % 21),
            format!("{}", 1000 + id),
            format!("PM{:05}", 10000 + id * 7),
            format!("{lat:.6}"),
            format!("{lon:.6}"),
        ])?;
    }

    writer.into_inner().context("flushing CSV writer")
}

fn main() -> Result<()> {
    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./resources/data/"));
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating {}", data_dir.display()))?;

    let mut rng = SimpleRng::new(42);

    let air = data_dir.join("madrid_air_quality_stations.csv");
    std::fs::write(&air, air_quality_csv(&mut rng)?)?;
    println!("Wrote {} air quality stations to {}", AIR_STATIONS.len(), air.display());

    let traffic = data_dir.join("traffic_stations.csv");
    std::fs::write(&traffic, traffic_csv(&mut rng)?)?;
    println!("Wrote 120 traffic stations to {}", traffic.display());

    Ok(())
}
