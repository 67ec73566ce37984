/// Data layer: core types, loading, merging and filtering.
///
/// Architecture:
/// ```text
///  smart_table.txt   proteins.fasta     EV8 / EV9 sheets
///        │                 │                   │
///        ▼                 ▼                   ▼
///   ┌──────────────────────────┐      ┌──────────────┐
///   │  loader (+ weight)        │      │   loader      │
///   └──────────────────────────┘      └──────────────┘
///        │ GeneList                          │ ProteomicsTable ×2
///        │                                   ▼
///        │                            ┌──────────────┐
///        │                            │ merge::concat │
///        │                            └──────────────┘
///        ▼                                   │
///   ┌────────────────────────────────────────────┐
///   │ merge::annotate → RiboTable (copies / µm³)  │
///   └────────────────────────────────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  exclusions, condition / gene selection, sampling
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod merge;
pub mod model;
pub mod weight;
