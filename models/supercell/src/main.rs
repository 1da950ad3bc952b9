use anyhow::{
	bail,
	Context,
	Result
};

use clap::Parser;

use log::info;

use std::{
	fs,
	path::{
		Path,
		PathBuf
	}
};

use conv3d_models_supercell::{
	decode_binary_with,
	encode_binary,
	json::{
		from_json,
		to_json
	},
	migrate_version,
	version::LEGACY_MINOR_VERSION,
	DEFAULT_MINOR_VERSION
};

/// Converts Supercell SCW models to JSON and back, or between SCW versions
#[derive(Debug, Parser)]
#[command(name = "conv3d", version)]
struct Args {
	/// The input file path (.scw or .json)
	#[arg(long)]
	in_file: PathBuf,

	/// The output file path
	#[arg(long)]
	out_file: Option<PathBuf>,

	/// SCW minor version of the input, not stored in the file itself
	#[arg(long, default_value_t = DEFAULT_MINOR_VERSION)]
	minor_version: u16,

	/// SCW major version to migrate the output to
	#[arg(long, default_value_t = 2)]
	out_version: u16,

	/// Re-encode an SCW model instead of producing JSON
	#[arg(long)]
	scw2scw: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Kind {
	Scw,
	Json,
}

fn kind_of(path: &Path) -> Result<Kind> {
	match path.extension().and_then(|e| e.to_str()) {
		Some(e) if e.eq_ignore_ascii_case("scw") => Ok(Kind::Scw),
		Some(e) if e.eq_ignore_ascii_case("json") => Ok(Kind::Json),
		_ => bail!("Cannot tell the format of {} from its extension", path.display()),
	}
}

fn main() -> Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

	let args = Args::parse();
	let input = kind_of(&args.in_file)?;
	let json_out = input == Kind::Scw && !args.scw2scw;

	let out_file = match &args.out_file {
		Some(path) => path.clone(),
		None if args.scw2scw => args.in_file.clone(),
		None if json_out => PathBuf::from("output.scw.json"),
		None => PathBuf::from("output.scw"),
	};

	let file = match input {
		Kind::Scw => {
			let data = fs::read(&args.in_file)
				.with_context(|| format!("Failed to read {}", args.in_file.display()))?;

			decode_binary_with(&data, args.minor_version)
				.with_context(|| format!("Failed to decode {}", args.in_file.display()))?
		},
		Kind::Json => {
			let text = fs::read_to_string(&args.in_file)
				.with_context(|| format!("Failed to read {}", args.in_file.display()))?;

			from_json(&text).with_context(|| format!("Failed to parse {}", args.in_file.display()))?
		},
	};

	let file = match args.out_version {
		v if v >= 2 => migrate_version(&file, v, 0),
		v => migrate_version(&file, v, LEGACY_MINOR_VERSION),
	};

	let out = if json_out {
		to_json(&file)?.into_bytes()
	} else {
		encode_binary(&file).context("Failed to encode the model")?
	};

	fs::write(&out_file, out).with_context(|| format!("Failed to write {}", out_file.display()))?;

	info!("{} -> {}", args.in_file.display(), out_file.display());

	Ok(())
}
