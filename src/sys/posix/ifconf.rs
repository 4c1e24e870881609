use std::str;

const IFNAMSIZ: usize = libc::IFNAMSIZ;
const SOCKADDR_LEN: usize = crate::format::SOCKADDR_LEN;

/// Shape of the records in a `SIOCGIFCONF` buffer.
#[derive(Copy, Clone, Debug)]
pub(crate) struct IfconfLayout {
    /// `sizeof(struct ifreq)`
    pub(crate) ifreq_len: usize,
    /// Records grow past `ifreq_len` when their sockaddr is longer than a plain sockaddr.
    pub(crate) sa_len: bool,
}

/// Walks the variable-length `ifreq` records filled in by `SIOCGIFCONF`.
pub(crate) struct IfconfRecords<'a> {
    buf: &'a [u8],
    offset: usize,
    layout: IfconfLayout,
}

impl<'a> IfconfRecords<'a> {
    pub(crate) fn new(buf: &'a [u8], layout: IfconfLayout) -> Self {
        Self {
            buf,
            offset: 0,
            layout,
        }
    }
}

#[derive(Debug)]
pub(crate) struct IfconfRecord<'a>(&'a [u8]);

impl<'a> IfconfRecord<'a> {
    pub(crate) fn name(&self) -> Option<&'a str> {
        let raw = &self.0[..IFNAMSIZ];
        let end = raw.iter().position(|c| *c == 0).unwrap_or(raw.len());
        str::from_utf8(&raw[..end]).ok().filter(|name| !name.is_empty())
    }
}

impl<'a> Iterator for IfconfRecords<'a> {
    type Item = IfconfRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.buf.get(self.offset..)?;
        if rest.len() < IFNAMSIZ {
            return None;
        }

        let mut len = self.layout.ifreq_len;
        if self.layout.sa_len {
            let sa_len = *rest.get(IFNAMSIZ)? as usize;
            len += sa_len.saturating_sub(SOCKADDR_LEN);
        }
        if len == 0 {
            return None;
        }

        self.offset += len;
        Some(IfconfRecord(&rest[..len.min(rest.len())]))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(name: &str, sa_len: u8, total: usize) -> Vec<u8> {
        let mut rec = vec![0u8; total];
        rec[..name.len()].copy_from_slice(name.as_bytes());
        rec[IFNAMSIZ] = sa_len;
        rec
    }

    #[test]
    fn fixed_stride() {
        let layout = IfconfLayout {
            ifreq_len: 40,
            sa_len: false,
        };
        let mut buf = record("lo", 0, 40);
        buf.extend(record("eth0", 0, 40));
        let names: Vec<_> = IfconfRecords::new(&buf, layout)
            .filter_map(|r| r.name())
            .collect();
        assert_eq!(names, vec!["lo", "eth0"]);
    }

    #[test]
    fn variable_stride() {
        let layout = IfconfLayout {
            ifreq_len: 32,
            sa_len: true,
        };
        // sockaddr_in6 is 28 bytes: 12 more than a sockaddr
        let mut buf = record("en0", 28, 32 + 12);
        buf.extend(record("en0", 16, 32));
        // sockaddr_dl with a short name: no growth
        buf.extend(record("lo0", 12, 32));
        let names: Vec<_> = IfconfRecords::new(&buf, layout)
            .filter_map(|r| r.name())
            .collect();
        assert_eq!(names, vec!["en0", "en0", "lo0"]);
    }

    #[test]
    fn trailing_fragment_is_ignored() {
        let layout = IfconfLayout {
            ifreq_len: 40,
            sa_len: false,
        };
        let mut buf = record("eth0", 0, 40);
        buf.extend([0u8; 8]);
        assert_eq!(IfconfRecords::new(&buf, layout).count(), 1);
    }
}
