//! Command line interface over the on-disk stores

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::characters::CharacterSlotStore;
use crate::config::SettingsStore;
use crate::constants::config;
use crate::profile::Profile;
use crate::service::ProfileService;
use crate::weapon_context::{self, EquipmentSource, EquippedItem};

#[derive(Parser, Debug)]
#[command(name = "action-bars")]
#[command(author, version, about = "Inspect and edit action bar profiles", long_about = None)]
pub struct Cli {
    /// Use this directory instead of the platform config directory
    #[arg(long = "config-dir", value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the current profile
    Show {
        /// Dump the full profile as JSON
        #[arg(long)]
        json: bool,
    },
    AddRow,
    RemoveRow,
    AddSlot,
    RemoveSlot,
    AddHotbar,
    RemoveHotbar,
    /// Set rows and slots per row in one step
    Resize { rows: usize, slots: usize },
    /// Set the scale in percent
    SetScale { scale: i32 },
    /// Print a character's stored overlay
    Character { id: String },
    /// Print the context keys for a hand setup
    Context {
        /// Main-hand weapon type
        #[arg(long = "main", value_name = "TYPE")]
        main: Option<i32>,

        /// Off-hand weapon type
        #[arg(long = "off", value_name = "TYPE", conflicts_with = "off_item")]
        off: Option<i32>,

        /// Off-hand non-weapon item id
        #[arg(long = "off-item", value_name = "ITEM_ID")]
        off_item: Option<i32>,
    },
}

/// Hands described on the command line
struct ArgHands {
    main: Option<EquippedItem>,
    off: Option<EquippedItem>,
}

impl EquipmentSource for ArgHands {
    fn main_hand(&self) -> Result<Option<EquippedItem>> {
        Ok(self.main.clone())
    }

    fn off_hand(&self) -> Result<Option<EquippedItem>> {
        Ok(self.off.clone())
    }

    fn current_weapon(&self) -> Result<Option<EquippedItem>> {
        Ok(None)
    }
}

fn open_service(config_dir: Option<&PathBuf>) -> ProfileService {
    match config_dir {
        Some(dir) => ProfileService::new(
            SettingsStore::load_from(dir.join(config::FILENAME)),
            CharacterSlotStore::at(dir.join(config::CHARACTER_SLOTS_DIR)),
        ),
        None => ProfileService::open(),
    }
}

fn open_characters(config_dir: Option<&PathBuf>) -> CharacterSlotStore {
    match config_dir {
        Some(dir) => CharacterSlotStore::at(dir.join(config::CHARACTER_SLOTS_DIR)),
        None => CharacterSlotStore::open(),
    }
}

fn report(changed: bool, what: &str) {
    if changed {
        println!("{what}");
    } else {
        println!("{what}: nothing to change");
    }
}

/// One line per row, `.` for empty slots and `x` suffix for disabled ones
pub fn render_profile(profile: &Profile) -> String {
    let mut out = format!(
        "rows={} slots_per_row={} scale={}% hide_left_nav={} combat_mode={}\n",
        profile.rows, profile.slots_per_row, profile.scale, profile.hide_left_nav, profile.combat_mode
    );
    for bar in &profile.hotbars {
        out.push_str(&format!("{} ({}):\n", bar.binding.name, bar.index));
        for row in bar.slots.chunks(profile.slots_per_row.max(1)) {
            let cells: Vec<String> = row
                .iter()
                .map(|slot| {
                    let mut cell = if slot.has_item() {
                        slot.item_id.to_string()
                    } else {
                        ".".to_string()
                    };
                    if slot.config.is_dynamic {
                        cell.push('*');
                    }
                    if slot.config.is_disabled {
                        cell.push('x');
                    }
                    cell
                })
                .collect();
            out.push_str("  ");
            out.push_str(&cells.join(" "));
            out.push('\n');
        }
    }
    out
}

pub fn run(cli: Cli) -> Result<()> {
    let config_dir = cli.config_dir.as_ref();

    match cli.command {
        Command::Show { json } => {
            let service = open_service(config_dir);
            if json {
                let text = serde_json::to_string_pretty(service.profile())
                    .context("Failed to serialize profile")?;
                println!("{text}");
            } else {
                print!("{}", render_profile(service.profile()));
            }
        }
        Command::AddRow => report(open_service(config_dir).add_row(), "Added row"),
        Command::RemoveRow => report(open_service(config_dir).remove_row(), "Removed row"),
        Command::AddSlot => report(open_service(config_dir).add_slot(), "Added slot"),
        Command::RemoveSlot => report(open_service(config_dir).remove_slot(), "Removed slot"),
        Command::AddHotbar => report(open_service(config_dir).add_hotbar(), "Added hotbar"),
        Command::RemoveHotbar => {
            report(open_service(config_dir).remove_hotbar(), "Removed hotbar")
        }
        Command::Resize { rows, slots } => {
            let mut service = open_service(config_dir);
            report(service.update_dimensions(rows, slots), "Resized");
            print!("{}", render_profile(service.profile()));
        }
        Command::SetScale { scale } => {
            let mut service = open_service(config_dir);
            report(service.set_scale(scale), "Scale updated");
        }
        Command::Character { id } => {
            let characters = open_characters(config_dir);
            match characters
                .read(&id)
                .with_context(|| format!("Failed to read overlay for {id}"))?
            {
                Some(data) => {
                    let text = serde_json::to_string_pretty(&data)
                        .context("Failed to serialize overlay")?;
                    println!("{text}");
                }
                None => println!("No overlay stored for {id}"),
            }
        }
        Command::Context {
            main,
            off,
            off_item,
        } => {
            let hands = ArgHands {
                main: main.map(|t| EquippedItem::weapon("main", t)),
                off: match (off, off_item) {
                    (Some(t), _) => Some(EquippedItem::weapon("off", t)),
                    (None, Some(id)) => Some(EquippedItem::other("off", id)),
                    (None, None) => None,
                },
            };
            let context = weapon_context::resolve(&hands);
            println!("signature: {}", context.signature());
            println!("edit key:  {}", context.edit_key);
            println!("resolve:   {}", context.resolve_keys.join(" -> "));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SlotAssignment, SlotKey};
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_context_flags() {
        let cli = Cli::try_parse_from(["action-bars", "context", "--main", "2", "--off-item", "5"])
            .unwrap();
        match cli.command {
            Command::Context {
                main,
                off,
                off_item,
            } => {
                assert_eq!(main, Some(2));
                assert_eq!(off, None);
                assert_eq!(off_item, Some(5));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(
            Cli::try_parse_from(["action-bars", "context", "--off", "1", "--off-item", "5"])
                .is_err()
        );
    }

    #[test]
    fn test_render_marks_items_and_flags() {
        let mut profile = Profile::default();
        profile.slots_per_row = 3;
        profile.hotbars[0].slots.truncate(3);
        profile
            .slot_mut(SlotKey::new(0, 0))
            .unwrap()
            .set_assignment(&SlotAssignment::new(15, None));
        profile.hotbars[0].slots[1].config.is_dynamic = true;
        profile.hotbars[0].slots[2].config.is_disabled = true;

        let text = render_profile(&profile);
        assert!(text.contains("Hotbar_1 (0):"));
        assert!(text.contains("  15 .* .x\n"));
    }

    #[test]
    fn test_commands_persist_under_config_dir() {
        let dir = TempDir::new().unwrap();
        let dir_arg = dir.path().to_string_lossy().to_string();

        let cli = Cli::try_parse_from(["action-bars", "--config-dir", dir_arg.as_str(), "add-row"]).unwrap();
        run(cli).unwrap();
        let cli =
            Cli::try_parse_from(["action-bars", "--config-dir", dir_arg.as_str(), "set-scale", "120"]).unwrap();
        run(cli).unwrap();

        let service = open_service(Some(&dir.path().to_path_buf()));
        assert_eq!(service.profile().rows, 2);
        assert_eq!(service.profile().scale, 120);
        assert_eq!(service.settings().values().rows, 2);
    }

    #[test]
    fn test_add_slot_rekeys_stored_overlays() {
        let dir = TempDir::new().unwrap();
        let dir_arg = dir.path().to_string_lossy().to_string();
        let run_args = |args: &[&str]| {
            let mut argv = vec!["action-bars", "--config-dir", dir_arg.as_str()];
            argv.extend_from_slice(args);
            run(Cli::try_parse_from(argv).unwrap()).unwrap();
        };

        run_args(&["resize", "2", "3"]);
        let mut profile = open_service(Some(&dir.path().to_path_buf())).profile().clone();
        profile
            .slot_mut(SlotKey::new(0, 4))
            .unwrap()
            .set_assignment(&SlotAssignment::new(31, None));
        let mut characters = open_characters(Some(&dir.path().to_path_buf()));
        assert!(characters.save_character_slots("Scout", &profile, &Default::default()));

        run_args(&["add-slot"]);
        let data = open_characters(Some(&dir.path().to_path_buf()))
            .read("Scout")
            .unwrap()
            .unwrap();
        assert_eq!(data.slots.keys().copied().collect::<Vec<_>>(), vec![SlotKey::new(0, 5)]);
    }
}
