//! ndjpeg CLI - encode, decode and inspect N-dimensional block-transform codestreams.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use env_logger::{Builder, Env};
use log::{info, LevelFilter};
use ndjpeg_rs::stream_reader::StreamReader;
use ndjpeg_rs::{
    CodecError, ColorModel, DecodedImage, EncoderOptions, EntropyCoding, MtfHeuristic, PreconditionKind,
    Samples, VolumeInfo,
};
use thiserror::Error;

/// Block-transform codec for 2D images, 3D stacks and 4D light fields
#[derive(Parser)]
#[command(name = "ndjpeg")]
#[command(version)]
#[command(about = "Encode, decode and inspect N-dimensional block-transform codestreams", long_about = None)]
#[command(after_help = "EXAMPLES:
    ndjpeg encode -i photo.ppm -o photo.ndj -q 90
    ndjpeg encode -i stack.raw -o stack.ndj --dims 256,256,64 --entropy cabac
    ndjpeg encode -i field.raw -o field.ndj --dims 64,64,8,8 --bits 16 --precondition bwt-mtf
    ndjpeg decode -i photo.ndj -o photo.ppm -f pnm
    ndjpeg info -i stack.ndj")]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode samples into a codestream
    ///
    /// Without --dims the input is read as a binary PGM (P5) or PPM (P6) image.
    /// With --dims the input is raw interleaved samples, 16-bit ones big-endian.
    #[command(visible_alias = "e")]
    Encode {
        #[arg(short, long, help = "Path to the input samples")]
        input: PathBuf,

        #[arg(short, long, help = "Path for the encoded output file")]
        output: PathBuf,

        /// Comma-separated extents, axis 0 first (2 to 4 values)
        #[arg(short, long, value_delimiter = ',')]
        dims: Option<Vec<usize>>,

        /// Interleaved planes per pixel (raw input only)
        #[arg(short = 'n', long, default_value = "1")]
        planes: usize,

        /// Bits per sample of raw input
        #[arg(short, long, default_value = "8", value_parser = ["8", "16"])]
        bits: String,

        /// Quality level (1-100)
        #[arg(short, long, default_value = "75")]
        quality: u32,

        #[arg(short, long, default_value = "huffman", value_enum)]
        entropy: Entropy,

        /// Symbol preconditioning (Huffman only)
        #[arg(short, long, default_value = "none", value_enum)]
        precondition: Precondition,

        /// Move-to-front list heuristic for the mtf stages
        #[arg(long, default_value = "move-to-front", value_enum)]
        heuristic: Heuristic,

        #[arg(short, long, default_value = "auto", value_enum)]
        color: Color,
    },

    /// Decode a codestream to raw samples or PGM/PPM
    #[command(visible_alias = "d")]
    Decode {
        #[arg(short, long, help = "Path to the codestream")]
        input: PathBuf,

        #[arg(short, long, help = "Path for the decoded samples")]
        output: PathBuf,

        /// Output format; pnm needs a 2D stream with 1 or 3 planes
        #[arg(short, long, default_value = "raw", value_enum)]
        format: OutputFormat,
    },

    /// Display the header of a codestream
    #[command(visible_alias = "i")]
    Info {
        #[arg(short, long, help = "Path to the codestream")]
        input: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Raw interleaved samples, 16-bit ones big-endian
    Raw,
    /// Portable GrayMap / PixMap
    Pnm,
}

#[derive(Clone, Copy, ValueEnum)]
enum Entropy {
    Huffman,
    Cabac,
}

#[derive(Clone, Copy, ValueEnum)]
enum Precondition {
    None,
    Bwt,
    Mtf,
    BwtMtf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Heuristic {
    MoveToFront,
    MoveUpExceptFront,
    FrequencyThreshold,
    DistanceScaled,
}

#[derive(Clone, Copy, ValueEnum)]
enum Color {
    Auto,
    None,
    Ycbcr,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Input(String),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Codec(e) => e.kind().exit_code(),
            CliError::Io(_) => ndjpeg_rs::ErrorKind::Io.exit_code(),
            CliError::Input(_) => ndjpeg_rs::ErrorKind::Format.exit_code(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Encode {
            input,
            output,
            dims,
            planes,
            bits,
            quality,
            entropy,
            precondition,
            heuristic,
            color,
        } => {
            let options = EncoderOptions {
                quality,
                entropy: match entropy {
                    Entropy::Huffman => EntropyCoding::Huffman,
                    Entropy::Cabac => EntropyCoding::Cabac,
                },
                precondition: precondition_kind(precondition, heuristic),
                color_model: match color {
                    Color::Auto => None,
                    Color::None => Some(ColorModel::None),
                    Color::Ycbcr => Some(ColorModel::YCbCr),
                },
                traversal_order: None,
            };
            let bits = if bits == "16" { 16 } else { 8 };
            encode_file(&input, &output, dims, planes, bits, &options)
        }
        Commands::Decode { input, output, format } => decode_file(&input, &output, &format),
        Commands::Info { input } => show_info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let mut builder = Builder::from_env(Env::new().default_filter_or(default_level));
    if verbose && std::env::var_os("RUST_LOG").is_none() {
        builder.filter_module("ndjpeg_rs", LevelFilter::Debug);
    }
    builder.init();
}

fn precondition_kind(precondition: Precondition, heuristic: Heuristic) -> PreconditionKind {
    let heuristic = match heuristic {
        Heuristic::MoveToFront => MtfHeuristic::MoveToFront,
        Heuristic::MoveUpExceptFront => MtfHeuristic::MoveUpExceptFront,
        Heuristic::FrequencyThreshold => MtfHeuristic::FrequencyThreshold,
        Heuristic::DistanceScaled => MtfHeuristic::DistanceScaled,
    };
    match precondition {
        Precondition::None => PreconditionKind::None,
        Precondition::Bwt => PreconditionKind::Bwt,
        Precondition::Mtf => PreconditionKind::Mtf(heuristic),
        Precondition::BwtMtf => PreconditionKind::BwtMtf(heuristic),
    }
}

fn encode_file(
    input: &Path,
    output: &Path,
    dims: Option<Vec<usize>>,
    planes: usize,
    bits: u32,
    options: &EncoderOptions,
) -> Result<(), CliError> {
    let data = fs::read(input)?;
    let (info, samples) = match dims {
        Some(dims) => {
            let info = VolumeInfo::new(dims, planes);
            let samples = if bits == 16 {
                Samples::Sixteen(sixteen_bit_samples(&data)?)
            } else {
                Samples::Eight(data)
            };
            (info, samples)
        }
        None => read_pnm(&data)?,
    };

    let encoded = match &samples {
        Samples::Eight(samples) => ndjpeg_rs::compress_with(samples, &info, options)?,
        Samples::Sixteen(samples) => ndjpeg_rs::compress_with(samples, &info, options)?,
    };
    fs::write(output, &encoded)?;

    info!("wrote {} byte(s) to {:?}", encoded.len(), output);
    println!(
        "✓ Encoded {:?} x {} plane(s) to {:?} ({} -> {} bytes)",
        info.dims,
        info.plane_count,
        output,
        fs::metadata(input)?.len(),
        encoded.len()
    );
    Ok(())
}

fn decode_file(input: &Path, output: &Path, format: &OutputFormat) -> Result<(), CliError> {
    let data = fs::read(input)?;
    let image = ndjpeg_rs::decompress(&data)?;

    match format {
        OutputFormat::Raw => fs::write(output, raw_bytes(&image.samples))?,
        OutputFormat::Pnm => write_pnm(output, &image)?,
    }

    println!(
        "✓ Decoded {:?} x {} plane(s), {} bits, to {:?}",
        image.info.dims, image.info.plane_count, image.bits_per_sample, output
    );
    Ok(())
}

fn show_info(input: &Path) -> Result<(), CliError> {
    let data = fs::read(input)?;
    let mut reader = StreamReader::new(&data);
    let header = reader.read_header()?;

    println!("File: {:?}", input);
    println!("Dimensions: {}D {:?}", header.dimensionality.count(), header.dims);
    println!("Planes: {}", header.plane_count);
    println!("Bits per sample: {}", header.bits_per_sample);
    println!("Quality: {}", header.quality);
    println!("Color model: {:?}", header.color_model);
    println!("Entropy coding: {:?}", header.entropy);
    println!("Preconditioning: {:?}", header.precondition);
    println!(
        "Traversal: {}",
        if header.traversal.is_default() { "diagonal" } else { "custom" }
    );
    println!("Header size: {} bytes", reader.position());
    println!("Payload size: {} bytes", reader.remaining_data().len());
    Ok(())
}

/// Big-endian 16-bit samples; a dangling byte is an input error.
fn sixteen_bit_samples(data: &[u8]) -> Result<Vec<u16>, CliError> {
    if data.len() % 2 != 0 {
        return Err(CliError::Input(format!(
            "16-bit input has an odd number of bytes ({})",
            data.len()
        )));
    }
    Ok(data.chunks_exact(2).map(|b| u16::from_be_bytes([b[0], b[1]])).collect())
}

fn raw_bytes(samples: &Samples) -> Vec<u8> {
    match samples {
        Samples::Eight(samples) => samples.clone(),
        Samples::Sixteen(samples) => samples.iter().flat_map(|s| s.to_be_bytes()).collect(),
    }
}

fn write_pnm(path: &Path, image: &DecodedImage) -> Result<(), CliError> {
    use std::io::Write;

    let magic = match (image.info.dims.len(), image.info.plane_count) {
        (2, 1) => "P5",
        (2, 3) => "P6",
        _ => {
            return Err(CliError::Input(format!(
                "PNM output needs a 2D image with 1 or 3 planes, got {:?} x {}",
                image.info.dims, image.info.plane_count
            )));
        }
    };
    let max_value = (1u32 << image.bits_per_sample) - 1;

    let mut file = fs::File::create(path)?;
    writeln!(file, "{}", magic)?;
    writeln!(file, "{} {}", image.info.dims[0], image.info.dims[1])?;
    writeln!(file, "{}", max_value)?;
    file.write_all(&raw_bytes(&image.samples))?;
    Ok(())
}

/// Parses a binary PGM (P5) or PPM (P6) file; max values above 255 mean 16-bit big-endian samples.
fn read_pnm(data: &[u8]) -> Result<(VolumeInfo, Samples), CliError> {
    let mut position = 0;
    let mut fields = Vec::with_capacity(4);
    while fields.len() < 4 {
        // Skip whitespace and comments.
        while position < data.len() {
            match data[position] {
                b'#' => {
                    while position < data.len() && data[position] != b'\n' {
                        position += 1;
                    }
                }
                c if c.is_ascii_whitespace() => position += 1,
                _ => break,
            }
        }
        let start = position;
        while position < data.len() && !data[position].is_ascii_whitespace() {
            position += 1;
        }
        if start == position {
            return Err(CliError::Input("truncated PNM header".into()));
        }
        fields.push(String::from_utf8_lossy(&data[start..position]).into_owned());
    }
    // Exactly one whitespace byte separates the header from the samples.
    position += 1;

    let planes = match fields[0].as_str() {
        "P5" => 1,
        "P6" => 3,
        other => {
            return Err(CliError::Input(format!(
                "unsupported PNM type {:?}; use --dims for raw input",
                other
            )));
        }
    };
    let parse = |s: &str| s.parse::<usize>().map_err(|_| CliError::Input(format!("invalid PNM field {:?}", s)));
    let width = parse(&fields[1])?;
    let height = parse(&fields[2])?;
    let max_value = parse(&fields[3])?;

    let pixels = data.get(position..).unwrap_or_default();
    let info = VolumeInfo::new(vec![width, height], planes);
    let samples = if max_value > 255 {
        Samples::Sixteen(sixteen_bit_samples(pixels)?)
    } else {
        Samples::Eight(pixels.to_vec())
    };
    Ok((info, samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sixteen_bit_samples() {
        assert_eq!(sixteen_bit_samples(&[0x01, 0x02, 0xff, 0xfe]).unwrap(), vec![0x0102, 0xfffe]);
        assert!(sixteen_bit_samples(&[]).unwrap().is_empty());
        assert!(matches!(sixteen_bit_samples(&[0x01, 0x02, 0x03]), Err(CliError::Input(_))));
    }

    #[test]
    fn test_pnm_with_dangling_sample_byte() {
        let mut data = b"P5\n1 2\n65535\n".to_vec();
        data.extend_from_slice(&[0x12, 0x34, 0x56]);
        assert!(matches!(read_pnm(&data), Err(CliError::Input(_))));
        data.push(0x78);
        let (info, samples) = read_pnm(&data).unwrap();
        assert_eq!(info.dims, vec![1, 2]);
        assert!(matches!(samples, Samples::Sixteen(values) if values == vec![0x1234, 0x5678]));
    }
}
