use portage_keywords::{
    ArchTable, Atom, CacheEntry, CacheFormat, KeywordReport, KeywordVector, Stability,
};

const EXAMPLE: &str = "\
BDEPEND=virtual/pkgconfig
DEFINED_PHASES=compile configure install
DEPEND=sys-libs/ncurses:0=
DESCRIPTION=A small but very powerful text-based mail client
EAPI=8
HOMEPAGE=http://www.mutt.org/
KEYWORDS=alpha amd64 ~arm ~arm64 ~hppa ppc ppc64 ~riscv sparc x86
LICENSE=GPL-2
RDEPEND=sys-libs/ncurses:0=
SLOT=0
SRC_URI=https://bitbucket.org/mutt/mutt/downloads/mutt-2.2.13.tar.gz
_md5_=9a2cbc5298e45d8e3f7a2e0d35e6a947
";

fn main() {
    let entry = CacheEntry::parse(CacheFormat::Md5, EXAMPLE.to_string())
        .expect("failed to parse cache entry");

    println!("=== Parsed Cache Entry ===");
    println!("EAPI:        {}", entry.eapi().unwrap_or("0"));
    println!("Description: {}", entry.description().unwrap_or(""));
    println!("Slot:        {}", entry.slot().unwrap_or(""));
    println!("Keywords:    {}", entry.keywords().unwrap_or(""));

    let table: ArchTable = [
        "alpha", "amd64", "arm", "arm64", "hppa", "mips", "ppc", "ppc64", "riscv", "sparc",
        "x86",
    ]
    .into_iter()
    .collect();

    let mut vector = KeywordVector::new();
    vector.grow(table.len());
    vector.decode(entry.keywords().unwrap_or(""), &table);

    println!("\n=== Decoded Against the Arch Table ===");
    for (index, arch) in table.names().iter().enumerate() {
        let status = match vector.get(index) {
            Stability::Stable => "stable",
            Stability::Testing => "testing",
            Stability::Minus => "removed",
            Stability::None => "not keyworded",
        };
        println!("{arch:>8}: {status}");
    }

    let atom: Atom = "mail-client/mutt-2.2.13".parse().expect("invalid atom");
    let report = KeywordReport {
        atom,
        keywords: vector.snapshot(&table),
    };
    println!("\n=== Report Line ===");
    println!("{report}");
}
