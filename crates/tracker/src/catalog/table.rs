#![forbid(unsafe_code)]

/// Row of the built-in encounter table.
pub(super) struct Entry {
    pub key: &'static str,
    pub name: &'static str,
    /// Folder names the arcdps logger writes this encounter's logs under.
    pub folders: &'static [&'static str],
    /// Target ids; several when the fight has phases or split bosses.
    pub ids: &'static [u32],
}

const fn entry(
    key: &'static str,
    name: &'static str,
    folders: &'static [&'static str],
    ids: &'static [u32],
) -> Entry {
    Entry {
        key,
        name,
        folders,
        ids,
    }
}

pub(super) const BUILTIN: &[Entry] = &[
    // Raids, wing 1
    entry("vg", "Vale Guardian", &["Vale Guardian"], &[15438]),
    entry("gors", "Gorseval", &["Gorseval the Multifarious"], &[15429]),
    entry("sab", "Sabetha the Saboteur", &["Sabetha the Saboteur"], &[15375]),
    // Wing 2
    entry("sloth", "Slothasor", &["Slothasor"], &[16123]),
    // Berg, Zane, Narella
    entry("trio", "Bandit Trio", &["Berg", "Zane", "Narella"], &[16088, 16137, 16125]),
    entry("matt", "Matthias Gabrel", &["Matthias Gabrel"], &[16115]),
    // Wing 3
    entry("esc", "Escort", &["McLeod the Silent"], &[16253]),
    entry("kc", "Keep Construct", &["Keep Construct"], &[16235]),
    entry("tc", "Twisted Castle", &["Haunting Statue"], &[16247]),
    entry("xera", "Xera", &["Xera"], &[16246]),
    // Wing 4
    entry("cairn", "Cairn the Indomitable", &["Cairn the Indomitable"], &[17194]),
    entry("mo", "Mursaat Overseer", &["Mursaat Overseer"], &[17172]),
    entry("sam", "Samarog", &["Samarog"], &[17188]),
    entry("dei", "Deimos", &["Deimos"], &[17154]),
    // Wing 5
    entry("sh", "Soulless Horror", &["Soulless Horror"], &[19767]),
    entry("rr", "Desmina Escort", &["Desmina"], &[19828]),
    entry("bk", "Broken King", &["Broken King"], &[19691]),
    entry("se", "Soul Eater", &["Eater of Souls"], &[19536]),
    // Eye of Judgment, Eye of Fate
    entry("eyes", "Eyes", &["Eye of Judgment", "Eye of Fate"], &[19651, 19844]),
    entry("dhuum", "Dhuum", &["Dhuum"], &[19450]),
    // Wing 6
    entry("ca", "Conjured Amalgamate", &["Conjured Amalgamate"], &[43974]),
    entry("twins", "Twin Largos", &["Nikare", "Kenut"], &[21105, 21089]),
    // Qadim, Hydra, Destroyer, Patriarch, Matriarch
    entry("qadim", "Qadim", &["Qadim"], &[20934, 21285, 21073, 21183, 20997]),
    // Wing 7
    entry("adina", "Cardinal Adina", &["Cardinal Adina"], &[22006]),
    entry("sabir", "Cardinal Sabir", &["Cardinal Sabir"], &[21964]),
    entry("qpeer", "Qadim the Peerless", &["Qadim the Peerless"], &[22000]),
    // Fractals, 98 CM
    entry("mama", "M A M A", &["MAMA"], &[17021]),
    entry("siax", "Siax the Corrupted", &["Nightmare Oratuss"], &[17028]),
    entry(
        "enso",
        "Ensolyss of the Endless Torment",
        &["Ensolyss of the Endless Torment"],
        &[16948],
    ),
    // 99 CM
    entry("skor", "Skorvald the Shattered", &["Skorvald the Shattered"], &[17632]),
    entry("arriv", "Artsariiv", &["Artsariiv"], &[17949]),
    entry("arkk", "Arkk", &["Arkk"], &[17759]),
    // 100 CM
    entry("ai", "Ai, Keeper of the Peak", &["Sorrowful Spellcaster"], &[23254, 20497]),
    // Strikes, Icebrood Saga
    entry("ice", "Icebrood Construct", &["Icebrood Construct"], &[22154]),
    // Voice of the Fallen, Claw of the Fallen, Voice and Claw
    entry(
        "falln",
        "The Voice and The Claw",
        &["Voice of the Fallen", "Claw of the Fallen"],
        &[22343, 22481, 22315],
    ),
    // First phase, Icebrood Construct phase
    entry("frae", "Fraenir of Jormag", &["Fraenir of Jormag"], &[22492, 22436]),
    entry("bone", "Boneskinner", &["Boneskinner"], &[22521]),
    entry("whisp", "Whisper of Jormag", &["Whisper of Jormag"], &[22711]),
    entry("varia", "Cold War", &["Varinia Stormsounder"], &[22836]),
    // End of Dragons. Mai Trin, then Scarlet Briar in normal and challenge mode
    entry("trin", "Captain Mai Trin", &["Captain Mai Trin"], &[24033, 24768, 25247]),
    entry("ankka", "Ankka", &["Ankka"], &[23957]),
    // Li, Sniper, Mech Rider, Enforcer, Ritualist, Mindblade; normal then CM
    entry(
        "li",
        "Minister Li",
        &["Minister Li"],
        &[
            24485, 24266, 23612, 25259, 24660, 25271, 24261, 25236, 23618, 25242, 24254, 25280,
        ],
    ),
    entry("void", "Dragon Void", &["The Dragonvoid"], &[43488]),
    // Holiday missions
    entry("frezi", "Freezie", &["Freezie"], &[21333]),
];
