use clap::{Parser, Subcommand};
use geomag::field::{CoordMode, FieldParameter, Geomag};
use geomag::gridding::{
    contour_layer, levels, locate_dip_poles, sample_grid, ContourOptions, GridData, GridRequest,
    GridSpec, PoleSearch,
};
use geomag::utils::time::parse_date;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub type BinResult<T, E = Box<dyn std::error::Error + Send + Sync>> = Result<T, E>;

fn main() {
    if let Err(e) = bin_main() {
        eprintln!("error: {e}");
        if let Some(e) = e.source() {
            eprintln!("error: {e}");
        }
        std::process::exit(1);
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Coefficient file
    #[arg(long, short, env = "GEOMAG_COF", global = true)]
    model: Option<PathBuf>,

    /// Date as a decimal year (2024.5) or YYYY-MM-DD
    #[arg(long, short, value_parser = parse_date, global = true)]
    date: Option<f64>,

    /// Altitude in km
    #[arg(long, visible_alias = "alt", default_value = "0", global = true)]
    altitude: f64,

    /// Interpret latitude and altitude relative to a sphere instead of the WGS84 ellipsoid
    #[arg(long, action = clap::ArgAction::SetTrue, global = true)]
    geocentric: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Field and its annual change at one location
    #[command(allow_negative_numbers = true)]
    Point {
        /// Latitude in degrees, north positive
        lat: f64,

        /// Longitude in degrees, east positive
        lon: f64,
    },

    /// Sample one parameter over the globe, printing `lon lat value` per node
    Grid {
        #[arg(value_enum)]
        parameter: FieldParameter,

        /// Node spacing in degrees
        #[arg(long, default_value = "1")]
        step: f64,

        /// Gaussian smoothing radius in nodes
        #[arg(long, default_value = "0")]
        blur: f64,
    },

    /// Isolines of one parameter, printing `level lon1 lat1 lon2 lat2` per segment
    Contour {
        #[arg(value_enum)]
        parameter: FieldParameter,

        /// Node spacing in degrees
        #[arg(long, default_value = "1")]
        step: f64,

        /// Explicit levels, as a comma-separated list
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, conflicts_with = "interval")]
        levels: Option<Vec<f64>>,

        /// Spacing of levels across the sampled range
        #[arg(long, default_value = "10")]
        interval: f64,

        /// Place crossings at edge midpoints instead of interpolating
        #[arg(long, action = clap::ArgAction::SetTrue)]
        no_smoothing: bool,

        /// Gaussian smoothing radius in nodes
        #[arg(long, default_value = "0")]
        blur: f64,
    },

    /// Locate the north and south dip poles
    Poles,
}

impl Args {
    fn coord_mode(&self) -> CoordMode {
        if self.geocentric {
            CoordMode::Geocentric
        } else {
            CoordMode::Geodetic
        }
    }

    fn date(&self) -> BinResult<f64> {
        Ok(self.date.ok_or("a date is required, pass --date")?)
    }

    fn grid(&self, parameter: FieldParameter, step: f64, blur: f64, geomag: &Geomag) -> BinResult<GridData> {
        let spec = GridSpec::from_step(step)?;
        let request = GridRequest {
            date: self.date()?,
            coord_mode: self.coord_mode(),
            altitude_km: self.altitude,
            parameter,
            parallel: true,
        };
        let mut grid = sample_grid(geomag, &spec, &request);
        grid.blur(blur);
        Ok(grid)
    }
}

fn bin_main() -> BinResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let path = args
        .model
        .clone()
        .ok_or("no coefficient file given, pass --model or set GEOMAG_COF")?;
    let geomag = Geomag::from_file(&path)?;
    info!(path = %path.display(), "loaded coefficient file");

    let mut out = BufWriter::new(io::stdout().lock());
    match &args.command {
        Command::Point { lat, lon } => {
            let date = args.date()?;
            for warning in geomag.validity(date, args.altitude) {
                warn!("{warning}");
            }
            let (sample, change) =
                geomag.field_with_change(date, args.coord_mode(), args.altitude, *lat, *lon)?;
            writeln!(out, "model {}", sample.model_name)?;
            writeln!(out, "D {:10.2} deg  dD {:8.1} min/yr", sample.d_deg, change.d_min)?;
            writeln!(out, "I {:10.2} deg  dI {:8.1} min/yr", sample.i_deg, change.i_min)?;
            writeln!(out, "H {:10.1} nT   dH {:8.1} nT/yr", sample.h, change.h)?;
            writeln!(out, "X {:10.1} nT   dX {:8.1} nT/yr", sample.x, change.x)?;
            writeln!(out, "Y {:10.1} nT   dY {:8.1} nT/yr", sample.y, change.y)?;
            writeln!(out, "Z {:10.1} nT   dZ {:8.1} nT/yr", sample.z, change.z)?;
            writeln!(out, "F {:10.1} nT   dF {:8.1} nT/yr", sample.f, change.f)?;
            if let Some(warning) = sample.compass_warning() {
                warn!("{warning}");
            }
        }
        Command::Grid {
            parameter,
            step,
            blur,
        } => {
            let grid = args.grid(*parameter, *step, *blur, &geomag)?;
            let spec = grid.spec();
            for (y, row) in grid.rows().enumerate() {
                for (x, value) in row.iter().enumerate() {
                    writeln!(out, "{} {} {}", spec.lon(x), spec.lat(y), value)?;
                }
            }
        }
        Command::Contour {
            parameter,
            step,
            levels: explicit,
            interval,
            no_smoothing,
            blur,
        } => {
            let grid = args.grid(*parameter, *step, *blur, &geomag)?;
            let thresholds = match explicit {
                Some(list) => list.clone(),
                None => grid
                    .value_range()
                    .map(|(min, max)| levels(f64::from(min), f64::from(max), *interval))
                    .unwrap_or_default(),
            };
            info!(levels = thresholds.len(), unit = parameter.unit(), "contouring");
            let options = ContourOptions {
                smoothing: !no_smoothing,
            };
            for set in contour_layer(&grid, &thresholds, &options) {
                for s in set.segments {
                    writeln!(
                        out,
                        "{} {} {} {} {}",
                        set.level, s.start.lon, s.start.lat, s.end.lon, s.end.lat
                    )?;
                }
            }
        }
        Command::Poles => {
            let search = PoleSearch {
                coord_mode: args.coord_mode(),
                altitude_km: args.altitude,
                ..PoleSearch::default()
            };
            for pole in locate_dip_poles(&geomag, args.date()?, &search) {
                writeln!(
                    out,
                    "{} {:.2} {:.2} {:.2}",
                    pole.name, pole.lat, pole.lon, pole.inclination
                )?;
            }
        }
    }
    out.flush()?;
    Ok(())
}
