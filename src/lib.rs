//! # pom-class-finder
//!
//! Resolves a Maven project's dependencies against the local repository and
//! returns the source, or a reconstructed declaration, of any Java class they
//! contain.
//!
//! ## Architecture
//!
//! - **pom**: Project descriptor parsing
//! - **coordinate**: Coordinates, scopes, exclusions and the merged descriptor context
//! - **resolver**: Parent chains, property interpolation, dependency management and transitive resolution
//! - **repository**: Local repository layout and settings.xml lookup
//! - **probe**: Jar inspection and parallel class-to-archive lookup
//! - **catalog**: Class listing and glob search within a jar
//! - **classfile**: Class file decoding
//! - **descriptor**: JVM type descriptors and access flags
//! - **synth**: Source synthesis from decoded class files
//! - **structure**: Heuristic member extraction from Java source text
//! - **extract**: Class representations from sources jars or class files
//! - **cache**: In-process LRU caches and the persistent LMDB store
//! - **finder**: The lookup pipeline
//! - **tools**: JSON tool-call dispatch

pub mod cache;
pub mod catalog;
pub mod classfile;
pub mod cli;
pub mod config;
pub mod coordinate;
pub mod descriptor;
pub mod error;
pub mod extract;
pub mod finder;
pub mod pom;
pub mod probe;
pub mod repository;
pub mod resolver;
pub mod structure;
pub mod synth;
pub mod tools;
