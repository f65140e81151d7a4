// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Thin host program for the tiled renderer.  Wires a camera, a
//! framebuffer, and the engine together, renders one or more frames of
//! a zoom-in sequence, and writes each as a grayscale PNM file.  The
//! interactive window and input loop live elsewhere; this binary
//! stands in for them.

extern crate clap;
extern crate image;
extern crate mandelzoom;
extern crate num;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use image::pnm::{PNMEncoder, PNMSubtype, SampleEncoding};
use image::ColorType;
use mandelzoom::{Camera, TiledRenderer};
use num::Complex;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Given a string and a separator, returns the two values separated
/// by the separator.
fn parse_pair<T: FromStr>(s: &str, separator: char) -> Option<(T, T)> {
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_positive(s: &str, isnotanumber_err: &str, isnotpositive_err: &str) -> Result<(), String> {
    match f64::from_str(s) {
        Ok(v) => {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(isnotpositive_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const TILE_SIZE: &str = "tile-size";
const ZOOM: &str = "zoom";
const POSITION: &str = "position";
const THREADS: &str = "threads";
const ITERATIONS: &str = "iterations";
const FRAMES: &str = "frames";
const ZOOM_RATE: &str = "zoom-rate";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("mandelzoom")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Tiled Mandelbrot distance-estimation renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file (PNM); frame numbers are appended for sequences"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("1280x720")
                .validator(|s| validate_pair::<u32>(&s, 'x', "Could not parse canvas size"))
                .help("Size of the canvas, which must divide evenly into tiles"),
        )
        .arg(
            Arg::with_name(TILE_SIZE)
                .required(false)
                .long(TILE_SIZE)
                .takes_value(true)
                .default_value("16")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        256,
                        "Could not parse tile size",
                        "Tile size must be between 1 and 256",
                    )
                })
                .help("Edge length of the square work tiles"),
        )
        .arg(
            Arg::with_name(ZOOM)
                .required(false)
                .long(ZOOM)
                .short("z")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("0.8")
                .validator(|s| {
                    validate_positive(
                        &s,
                        "Could not parse zoom factor",
                        "Zoom factor must be a positive number",
                    )
                })
                .help("Half-width of the view on the complex plane"),
        )
        .arg(
            Arg::with_name(POSITION)
                .required(false)
                .long(POSITION)
                .short("p")
                .takes_value(true)
                .default_value("0.5,0.1")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse position"))
                .help("Pan offset on the complex plane"),
        )
        .arg(
            Arg::with_name(THREADS)
                .required(false)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Total rendering threads, this one included [default: all cores]"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("64")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        100_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 100000",
                    )
                })
                .help("Iteration bailout before a point is declared interior"),
        )
        .arg(
            Arg::with_name(FRAMES)
                .required(false)
                .long(FRAMES)
                .short("f")
                .takes_value(true)
                .default_value("1")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        10_000,
                        "Could not parse frame count",
                        "Frame count must be between 1 and 10000",
                    )
                })
                .help("Number of frames to render while zooming in"),
        )
        .arg(
            Arg::with_name(ZOOM_RATE)
                .required(false)
                .long(ZOOM_RATE)
                .takes_value(true)
                .default_value("0.95")
                .validator(|s| {
                    validate_positive(
                        &s,
                        "Could not parse zoom rate",
                        "Zoom rate must be a positive number",
                    )
                })
                .help("Per-frame zoom multiplier for sequences"),
        )
        .get_matches()
}

/// Write one frame as a binary graymap.  The framebuffer is grayscale
/// BGRA, so a single channel carries the whole image.
fn write_image(outfile: &Path, framebuffer: &[u8], bounds: (u32, u32)) -> Result<(), std::io::Error> {
    let gray: Vec<u8> = framebuffer.iter().step_by(4).cloned().collect();
    let output = File::create(outfile)?;
    let mut encoder =
        PNMEncoder::new(output).with_subtype(PNMSubtype::Graymap(SampleEncoding::Binary));
    encoder.encode(&gray[..], bounds.0, bounds.1, ColorType::Gray(8))?;
    Ok(())
}

/// The output path for a given frame of a sequence; single frames keep
/// the name the user asked for.
fn frame_path(outfile: &str, frame: usize, frames: usize) -> PathBuf {
    if frames == 1 {
        return PathBuf::from(outfile);
    }
    let path = PathBuf::from(outfile);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    let extension = path
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pnm".to_string());
    path.with_file_name(format!("{}-{:04}.{}", stem, frame, extension))
}

fn main() {
    let matches = args();
    let (width, height) =
        parse_pair(matches.value_of(SIZE).unwrap(), 'x').expect("Error parsing canvas size");
    let tile_size =
        u32::from_str(matches.value_of(TILE_SIZE).unwrap()).expect("Error parsing tile size");
    let zoom = f64::from_str(matches.value_of(ZOOM).unwrap()).expect("Error parsing zoom");
    let (offset_re, offset_im) =
        parse_pair(matches.value_of(POSITION).unwrap(), ',').expect("Error parsing position");
    let threads = matches
        .value_of(THREADS)
        .map(|s| usize::from_str(s).expect("Error parsing thread count"))
        .unwrap_or_else(num_cpus::get);
    let iterations = u32::from_str(matches.value_of(ITERATIONS).unwrap())
        .expect("Error parsing iteration count");
    let frames =
        usize::from_str(matches.value_of(FRAMES).unwrap()).expect("Error parsing frame count");
    let zoom_rate =
        f64::from_str(matches.value_of(ZOOM_RATE).unwrap()).expect("Error parsing zoom rate");
    let outfile = matches.value_of(OUTPUT).unwrap();

    // The calling thread renders too, so the pool gets one less.
    let mut renderer =
        match TiledRenderer::new(width, height, tile_size, iterations, threads.saturating_sub(1)) {
            Ok(renderer) => renderer,
            Err(e) => {
                eprintln!("Setup failure: {}", e);
                std::process::exit(1);
            }
        };

    let mut camera = Camera {
        zoom,
        offset: Complex::new(offset_re, offset_im),
    };
    let mut framebuffer = vec![0u8; renderer.frame_len()];

    for frame in 0..frames {
        if let Err(e) = renderer.render_frame(&camera, &mut framebuffer) {
            eprintln!("Render failure: {}", e);
            std::process::exit(1);
        }
        let path = frame_path(outfile, frame, frames);
        if let Err(e) = write_image(&path, &framebuffer, (width, height)) {
            eprintln!("Could not write {}: {}", path.display(), e);
            std::process::exit(1);
        }
        // Stand-in for the interactive zoom key: creep in a little
        // each frame.
        camera.zoom *= zoom_rate;
    }
}
